//! Junction CLI - resolve dimensions and generate SQL from a catalog snapshot
//!
//! Usage:
//!   junction dimensions <catalog> <node>
//!   junction shared <catalog> <metric>...
//!   junction sql <catalog> <node> [-d <dimension>]... [-f <filter>]... [--dialect <dialect>]
//!   junction list <catalog>
//!
//! Examples:
//!   junction dimensions catalog.toml revenue
//!   junction shared catalog.toml revenue order_count
//!   junction sql catalog.toml revenue -d customers.region -f "customers.region = 'west'" --dialect trino

use clap::{Parser, Subcommand, ValueEnum};
use junction::catalog::Catalog;
use junction::config::Settings;
use junction::graph::{NodeGraph, NodeType};
use junction::semantic::{
    list_metrics_with, DimensionAttributeOutput, DimensionResolver, Filter, QueryBuilder,
    QueryRequest, SharedDimensions,
};
use junction::sql::Dialect;
use junction::transpile::TranspilerRegistry;
use junction::JunctionResult;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "junction")]
#[command(about = "Junction - dimension resolution and multi-dialect SQL for a metrics layer")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $JUNCTION_CONFIG, ./junction.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dimension attributes a node can be sliced by
    Dimensions {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,

        /// Node name
        node: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List the dimension attributes shared by several metrics
    Shared {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,

        /// Metric names
        #[arg(required = true)]
        metrics: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Generate SQL for a node
    Sql {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,

        /// Node name
        node: String,

        /// Dimension to group or slice by (repeatable)
        #[arg(short, long = "dimension")]
        dimensions: Vec<String>,

        /// Filter predicate, e.g. "customers.region = 'west'" (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// SQL dialect to generate (defaults to the canonical dialect)
        #[arg(long)]
        dialect: Option<DialectArg>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List metrics with their dimensions
    List {
        /// Path to the catalog (.toml or .json)
        catalog: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Spark,
    Trino,
    Druid,
    Postgres,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Spark => Dialect::Spark,
            DialectArg::Trino => Dialect::Trino,
            DialectArg::Druid => Dialect::Druid,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human readable output
    Text,
    /// JSON output
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Commands::Dimensions {
            catalog,
            node,
            output,
        } => cmd_dimensions(&settings, &catalog, &node, output),
        Commands::Shared {
            catalog,
            metrics,
            output,
        } => cmd_shared(&settings, &catalog, &metrics, output),
        Commands::Sql {
            catalog,
            node,
            dimensions,
            filters,
            dialect,
            output,
        } => cmd_sql(
            &settings,
            &catalog,
            &node,
            dimensions,
            &filters,
            dialect.map(Dialect::from),
            output,
        ),
        Commands::List { catalog } => cmd_list(&settings, &catalog),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> JunctionResult<Settings> {
    Ok(match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    })
}

fn load_graph(path: &Path) -> JunctionResult<NodeGraph> {
    let catalog = Catalog::load(path)?;
    Ok(NodeGraph::from_catalog(&catalog)?)
}

fn resolver<'g>(graph: &'g NodeGraph, settings: &Settings) -> DimensionResolver<'g> {
    DimensionResolver::new(graph).with_max_visited_nodes(settings.resolver.max_visited_nodes)
}

fn print_dimensions(
    dimensions: &[DimensionAttributeOutput],
    output: OutputFormat,
) -> JunctionResult<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(dimensions)?),
        OutputFormat::Text => {
            if dimensions.is_empty() {
                println!("No dimensions.");
            }
            for dim in dimensions {
                println!("  - {} ({})", dim.name, dim.attribute_type);
            }
        }
    }
    Ok(())
}

fn cmd_dimensions(
    settings: &Settings,
    catalog: &Path,
    node: &str,
    output: OutputFormat,
) -> JunctionResult<()> {
    let graph = load_graph(catalog)?;
    let idx = graph.get_node_by_name(node, &[])?;

    let dimensions = resolver(&graph, settings).resolve(idx)?;
    print_dimensions(&dimensions, output)
}

fn cmd_shared(
    settings: &Settings,
    catalog: &Path,
    metrics: &[String],
    output: OutputFormat,
) -> JunctionResult<()> {
    let graph = load_graph(catalog)?;
    let nodes = metrics
        .iter()
        .map(|name| graph.get_node_by_name(name, &[NodeType::Metric]))
        .collect::<Result<Vec<_>, _>>()?;

    let dimensions = SharedDimensions::new(resolver(&graph, settings)).resolve(&nodes)?;
    print_dimensions(&dimensions, output)
}

fn cmd_sql(
    settings: &Settings,
    catalog: &Path,
    node: &str,
    dimensions: Vec<String>,
    filters: &[String],
    dialect: Option<Dialect>,
    output: OutputFormat,
) -> JunctionResult<()> {
    let graph = load_graph(catalog)?;
    let idx = graph.get_node_by_name(node, &[])?;

    let filters = filters
        .iter()
        .map(|text| text.parse::<Filter>())
        .collect::<Result<Vec<_>, _>>()?;
    let mut request = QueryRequest::new()
        .with_dimensions(dimensions)
        .with_filters(filters);
    request.dialect = dialect;

    let registry = TranspilerRegistry::with_builtin();
    let generated =
        QueryBuilder::from_settings(&graph, settings, &registry)?.build(idx, &request)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generated)?),
        OutputFormat::Text => {
            println!("-- Junction Generated SQL");
            println!("-- Node: {} ({})", generated.node.name, generated.node.version);
            println!("-- Dialect: {}", generated.dialect);
            if !generated.upstream_tables.is_empty() {
                println!("-- Upstream: {}", generated.upstream_tables.join(", "));
            }
            println!();
            println!("{}", generated.sql);
        }
    }
    Ok(())
}

fn cmd_list(settings: &Settings, catalog: &Path) -> JunctionResult<()> {
    let graph = load_graph(catalog)?;
    let metrics = list_metrics_with(resolver(&graph, settings), &graph)?;

    println!("File: {}", catalog.display());
    println!();

    if metrics.is_empty() {
        println!("No metrics defined.");
        return Ok(());
    }

    println!("Metrics:");
    for metric in &metrics {
        println!("  - {} ({})", metric.name, metric.version);
        for dimension in &metric.dimensions {
            println!("      {}", dimension);
        }
    }
    Ok(())
}
