//! Binary entry point for the strata CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use strata::{
    cli::{generate_edge_csv, load_edge_csv, BuildReport, CliError, EdgeCsvConfig, GenerateConfig},
    telemetry::install_tracing_subscriber,
    types::KeyKind,
    ClusterContext, CsrEngine, DistributedGraph, EdgeListOptions, GraphKind, KeyValue, StrataConfig,
    VertexDegree, VertexId,
};

#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Build and inspect distributed graphs from CSV edge lists",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "STRATA_WORKERS",
        help = "Number of simulated workers (overrides the config file)"
    )]
    workers: Option<usize>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GraphArgs {
    #[arg(long, value_name = "FILE", help = "CSV file containing edges")]
    edges: PathBuf,

    #[arg(long, default_value = "src", help = "Edge source column name")]
    source: String,

    #[arg(long, default_value = "dst", help = "Edge destination column name")]
    destination: String,

    #[arg(long, help = "Numeric column holding edge weights")]
    weight: Option<String>,

    #[arg(long, help = "Treat edges as undirected")]
    undirected: bool,

    #[arg(long, help = "Keep parallel edges")]
    multi_edge: bool,

    #[arg(long, help = "Use integer vertex ids as-is")]
    no_renumber: bool,

    #[arg(long, help = "Store adjacency by destination")]
    transposed: bool,

    #[arg(long, default_value_t = ',', help = "CSV field delimiter")]
    delimiter: char,
}

#[derive(Args, Debug)]
struct DegreeCmd {
    #[command(flatten)]
    graph: GraphArgs,

    #[arg(long = "vertex", value_name = "ID", help = "Restrict output to these vertices")]
    vertices: Vec<String>,

    #[arg(long, value_enum, default_value_t = DegreeKindArg::All)]
    kind: DegreeKindArg,
}

#[derive(Args, Debug)]
struct HasEdgeCmd {
    #[command(flatten)]
    graph: GraphArgs,

    #[arg(long, value_name = "ID")]
    src: String,

    #[arg(long, value_name = "ID")]
    dst: String,
}

#[derive(Args, Debug)]
struct GenerateCmd {
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    #[arg(long, default_value_t = 100)]
    vertices: u64,

    #[arg(long, default_value_t = 1000)]
    edges: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, help = "Add a weight column")]
    weighted: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Build a graph and report its layout")]
    Build(GraphArgs),

    #[command(about = "Print vertex degrees")]
    Degree(DegreeCmd),

    #[command(about = "Check whether an edge exists")]
    HasEdge(HasEdgeCmd),

    #[command(about = "Write a random edge list")]
    Generate(GenerateCmd),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DegreeKindArg {
    In,
    Out,
    All,
}

#[derive(Serialize)]
struct EdgeQuery<'a> {
    src: &'a VertexId,
    dst: &'a VertexId,
    exists: bool,
}

#[derive(Serialize)]
struct GenerateReport {
    path: PathBuf,
    edges: u64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = StrataConfig::load(cli.config.clone())?;
    if let Some(workers) = cli.workers {
        config.cluster.workers = workers;
    }
    install_tracing_subscriber(&config.logging.filter);

    match cli.command {
        Command::Build(args) => {
            let graph = build_graph(&config, &args).await?;
            let report = BuildReport::from_graph(&graph)?;
            emit(&cli.format, &report, |_| print_build_text(&report))?;
            graph.cluster().close();
        }
        Command::Degree(cmd) => {
            let graph = build_graph(&config, &cmd.graph).await?;
            let kinds = graph.number_map()?.key_kinds().to_vec();
            let subset = cmd
                .vertices
                .iter()
                .map(|raw| parse_vertex(raw, &kinds))
                .collect::<Result<Vec<_>, _>>()?;
            let subset = (!subset.is_empty()).then_some(subset.as_slice());
            let rows = match cmd.kind {
                DegreeKindArg::In => graph.in_degree(subset)?,
                DegreeKindArg::Out => graph.out_degree(subset)?,
                DegreeKindArg::All => graph.degree(subset)?,
            };
            emit(&cli.format, &rows, |_| print_degrees_text(&rows))?;
            graph.cluster().close();
        }
        Command::HasEdge(cmd) => {
            let graph = build_graph(&config, &cmd.graph).await?;
            let kinds = graph.number_map()?.key_kinds().to_vec();
            let src = parse_vertex(&cmd.src, &kinds)?;
            let dst = parse_vertex(&cmd.dst, &kinds)?;
            let exists = graph.has_edge(&src, &dst)?;
            let query = EdgeQuery {
                src: &src,
                dst: &dst,
                exists,
            };
            emit(&cli.format, &query, |_| println!("{exists}"))?;
            graph.cluster().close();
        }
        Command::Generate(cmd) => {
            let cfg = GenerateConfig {
                path: cmd.out.clone(),
                vertices: cmd.vertices,
                edges: cmd.edges,
                seed: cmd.seed,
                weighted: cmd.weighted,
            };
            let edges = generate_edge_csv(&cfg)?;
            let report = GenerateReport {
                path: cmd.out,
                edges,
            };
            emit(&cli.format, &report, |_| {
                println!("Wrote {} edges to {}", report.edges, report.path.display())
            })?;
        }
    }

    Ok(())
}

async fn build_graph(config: &StrataConfig, args: &GraphArgs) -> Result<DistributedGraph, CliError> {
    if !args.delimiter.is_ascii() {
        return Err(CliError::Message(format!("delimiter '{}' is not ASCII", args.delimiter)));
    }
    let delimiter = args.delimiter as u8;
    let cluster = ClusterContext::open(&config.cluster)?;
    let csv = EdgeCsvConfig {
        path: args.edges.clone(),
        delimiter,
    };
    let table = load_edge_csv(&csv, cluster.workers())?;

    let kind = GraphKind {
        directed: !args.undirected,
        multi_edge: args.multi_edge,
    };
    let mut graph = DistributedGraph::new(cluster, Arc::new(CsrEngine), kind)
        .with_renumber_options(config.renumber.clone());
    let mut options = EdgeListOptions::new(args.source.as_str(), args.destination.as_str())
        .renumber(!args.no_renumber)
        .store_transposed(args.transposed);
    if let Some(weight) = &args.weight {
        options = options.edge_attr(weight.as_str());
    }
    graph.from_edge_table(table, options).await?;
    Ok(graph)
}

fn parse_vertex(raw: &str, kinds: &[KeyKind]) -> Result<VertexId, CliError> {
    match kinds {
        [KeyKind::Int] => raw
            .parse::<i64>()
            .map(VertexId::from)
            .map_err(|_| CliError::Message(format!("vertex '{raw}' is not an integer"))),
        [KeyKind::Str] => Ok(VertexId::from(KeyValue::Str(raw.to_string()))),
        _ => Err(CliError::Message("composite vertices are not supported here".into())),
    }
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_build_text(report: &BuildReport) {
    println!("Session:    {}", report.session);
    println!("Vertices:   {}", report.vertices);
    println!("Edges:      {}", report.edges);
    println!("Directed:   {}", report.directed);
    println!("Weighted:   {}", report.weighted);
    println!("Renumbered: {}", report.renumbered);
    println!("Workers:");
    for worker in &report.workers {
        println!("  {:<10} {} edges", worker.worker, worker.edges);
    }
    let offsets: Vec<String> = report.segment_offsets.iter().map(u64::to_string).collect();
    println!("Segment offsets: [{}]", offsets.join(", "));
}

fn print_degrees_text(rows: &[VertexDegree]) {
    for row in rows {
        println!("{}\t{}", row.vertex, row.degree);
    }
}
