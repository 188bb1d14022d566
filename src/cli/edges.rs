use std::path::PathBuf;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;
use crate::table::{Column, EdgeTable, Frame};
use crate::types::{StrataError, WorkerId};

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Graph construction or query error.
    #[error(transparent)]
    Graph(#[from] StrataError),
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Where and how to read an edge list.
#[derive(Debug, Clone)]
pub struct EdgeCsvConfig {
    /// CSV file with a header row.
    pub path: PathBuf,
    /// Field delimiter.
    pub delimiter: u8,
}

impl EdgeCsvConfig {
    /// Comma-delimited file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }
}

/// Parameters for a synthetic edge list.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Output file.
    pub path: PathBuf,
    /// Vertex ids are drawn from `0..vertices`.
    pub vertices: u64,
    /// Number of rows to write.
    pub edges: u64,
    /// RNG seed; equal seeds produce identical files.
    pub seed: u64,
    /// Adds a `weight` column.
    pub weighted: bool,
}

/// Loads a CSV edge list and spreads its rows over `workers` in contiguous
/// chunks.
///
/// Column types are inferred per column: all integers give `Int64`, all
/// numbers give `Float64`, anything else is kept as text.
pub fn load_edge_csv(cfg: &EdgeCsvConfig, workers: &[WorkerId]) -> Result<EdgeTable, CliError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(cfg.delimiter)
        .trim(Trim::All)
        .from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CliError::Message(format!(
            "{} has no header row",
            cfg.path.display()
        )));
    }
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in raw.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let mut frame = Frame::new();
    for (name, values) in headers.iter().zip(raw) {
        frame.push_column(name, infer_column(values))?;
    }
    debug!(path = %cfg.path.display(), rows = frame.len(), "edge list loaded");
    Ok(EdgeTable::distribute(frame, workers)?)
}

/// Picks the narrowest column type that holds every value.
pub fn infer_column(values: Vec<String>) -> Column {
    if let Ok(ints) = values.iter().map(|v| v.parse::<i64>()).collect::<Result<Vec<_>, _>>() {
        return Column::Int64(ints);
    }
    if let Ok(floats) = values.iter().map(|v| v.parse::<f64>()).collect::<Result<Vec<_>, _>>() {
        return Column::Float64(floats);
    }
    Column::Utf8(values)
}

/// Writes a reproducible random edge list with `src,dst[,weight]` columns.
pub fn generate_edge_csv(cfg: &GenerateConfig) -> Result<u64, CliError> {
    if cfg.vertices == 0 && cfg.edges > 0 {
        return Err("--vertices must be positive when edges are requested".into());
    }
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let mut writer = WriterBuilder::new().from_path(&cfg.path)?;
    if cfg.weighted {
        writer.write_record(["src", "dst", "weight"])?;
    } else {
        writer.write_record(["src", "dst"])?;
    }
    for _ in 0..cfg.edges {
        let src = rng.gen_range(0..cfg.vertices).to_string();
        let dst = rng.gen_range(0..cfg.vertices).to_string();
        if cfg.weighted {
            let weight = format!("{:.3}", rng.gen_range(0.1..10.0f64));
            writer.write_record([src, dst, weight])?;
        } else {
            writer.write_record([src, dst])?;
        }
    }
    writer.flush()?;
    Ok(cfg.edges)
}
