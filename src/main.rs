mod annotations;
mod cli;
mod enrich;
mod kubernetes;
mod normalize;
mod report;
mod types;
mod utils;
mod xlsx;

use annotations::AnnotationStore;
use clap::Parser;
use cli::Cli;
use enrich::Enricher;
use kubernetes::{Source, load_inventory};
use regex::Regex;
use report::{ReportOptions, build_report};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let namespace_filter = match &cli.namespace_regex {
        Some(pattern) => match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                error!("Invalid regex pattern '{}': {}", pattern, e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let source = source_from_cli(&cli);
    match &source {
        Source::Offline(paths) => info!("Running in offline mode with {} export(s)", paths.len()),
        Source::Online { context } => info!(
            "Running in online mode, context: {}",
            context.as_deref().unwrap_or("current")
        ),
    }

    let annotations = AnnotationStore::load(&cli.description_yaml)?;
    info!(
        "Loaded {} descriptions from {}",
        annotations.entry_count(),
        cli.description_yaml.display()
    );

    let inventory = load_inventory(&source).await?;
    for (kind, count) in inventory.kinds() {
        info!("{}: {}", kind, count);
    }

    let node_roles = inventory.node_roles();
    info!("masters: {:?}", node_roles.masters);
    info!("workers: {:?}", node_roles.workers);

    let pods = inventory.pods()?;
    let enricher = Enricher::new(&inventory, cli.strict);
    let options = ReportOptions {
        namespace_filter,
        node_roles: cli.node_columns.then_some(node_roles),
    };
    let report = build_report(&pods, &annotations, &enricher, &options)?;

    xlsx::write_report(&report, &cli.output)
}

fn source_from_cli(cli: &Cli) -> Source {
    if cli.online || cli.offline.is_empty() {
        Source::Online {
            context: cli.context.clone(),
        }
    } else {
        Source::Offline(cli.offline.clone())
    }
}
