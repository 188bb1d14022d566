#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn write_edges(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("edges.csv");
    fs::write(&path, contents).expect("write edges");
    (dir, path)
}

fn stdout_json(output: std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn build_reports_counts_as_json() {
    let (_dir, path) = write_edges("src,dst\n0,1\n1,2\n2,0\n");
    let output = cargo_bin_cmd!("strata")
        .args(["--format", "json", "--workers", "2", "build", "--edges"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(output);
    assert_eq!(json["vertices"], 3);
    assert_eq!(json["edges"], 3);
    assert_eq!(json["directed"], true);
    assert_eq!(json["workers"].as_array().unwrap().len(), 2);
}

#[test]
fn undirected_build_doubles_edges() {
    let (_dir, path) = write_edges("a;b;w\nx;y;1.5\ny;z;2\n");
    let output = cargo_bin_cmd!("strata")
        .args(["--format", "json", "--workers", "3", "build", "--undirected"])
        .args(["--source", "a", "--destination", "b", "--weight", "w", "--delimiter", ";"])
        .arg("--edges")
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(output);
    assert_eq!(json["edges"], 4);
    assert_eq!(json["weighted"], true);
}

#[test]
fn degree_and_has_edge_answer_in_input_ids() {
    let (_dir, path) = write_edges("src,dst\nada,grace\ngrace,alan\nada,alan\n");
    let output = cargo_bin_cmd!("strata")
        .args(["--format", "json", "--workers", "2", "degree", "--vertex", "ada", "--kind", "out"])
        .arg("--edges")
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    let json = stdout_json(output);
    assert_eq!(json[0]["vertex"], "ada");
    assert_eq!(json[0]["degree"], 2);

    let output = cargo_bin_cmd!("strata")
        .args(["--workers", "2", "has-edge", "--src", "grace", "--dst", "ada"])
        .arg("--edges")
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");
}

#[test]
fn generate_then_build() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("random.csv");
    cargo_bin_cmd!("strata")
        .args(["generate", "--vertices", "30", "--edges", "200", "--seed", "3", "--out"])
        .arg(&path)
        .assert()
        .success();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 201);

    cargo_bin_cmd!("strata")
        .args(["--workers", "4", "build", "--multi-edge", "--edges"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn missing_column_fails() {
    let (_dir, path) = write_edges("src,dst\n0,1\n");
    cargo_bin_cmd!("strata")
        .args(["build", "--source", "from", "--edges"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn config_file_sets_worker_count() {
    let (dir, path) = write_edges("src,dst\n0,1\n1,2\n");
    let config = dir.path().join("strata.toml");
    fs::write(&config, "[cluster]\nworkers = 5\n\n[logging]\nfilter = \"warn\"\n").unwrap();
    let output = cargo_bin_cmd!("strata")
        .args(["--format", "json", "--config"])
        .arg(&config)
        .args(["build", "--edges"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout_json(output)["workers"].as_array().unwrap().len(), 5);
}
