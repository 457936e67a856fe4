use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use prometheus::{Encoder, Registry, TextEncoder};

use metaresolve_core::metrics::all_metrics;
use metaresolve_core::{
    event_channel, load_config, load_config_from_env, validate_config, BulkGroup, Config,
    MediaType, MetadataCatalog, ResolutionService, SanitizedConfig, StrategyKind, TmdbClient,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for the event channel
const EVENT_BUFFER_SIZE: usize = 1000;

/// Resolve local media titles against the TMDB catalog.
///
/// Every resolution event is printed to stdout as one JSON line, followed by
/// the bulk summary.
#[derive(Debug, Parser)]
#[command(name = "metaresolve", version)]
struct Cli {
    /// Titles to resolve, one group each
    #[arg(required_unless_present = "print_config")]
    titles: Vec<String>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "METARESOLVE_CONFIG")]
    config: Option<PathBuf>,

    /// Search strategy: exact, fuzzy, year or season
    #[arg(short, long)]
    strategy: Option<String>,

    /// Never auto-accept; always ask for a manual selection
    #[arg(long)]
    manual: bool,

    /// Search movies instead of TV series
    #[arg(long)]
    movie: bool,

    /// Print the effective configuration (API key hidden) and exit
    #[arg(long)]
    print_config: bool,

    /// Dump Prometheus metrics to stderr when the run finishes
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn media_type(&self) -> MediaType {
        if self.movie {
            MediaType::Movie
        } else {
            MediaType::Tv
        }
    }

    fn groups(&self) -> Vec<BulkGroup> {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                BulkGroup::new(format!("group-{}", i + 1), title.as_str())
                    .with_media_type(self.media_type())
            })
            .collect()
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("metaresolve v{}", VERSION);

    let mut config = load(&cli)?;
    if let Some(name) = &cli.strategy {
        config.resolver.default_strategy = StrategyKind::from_name(name);
    }
    validate_config(&config).context("Configuration validation failed")?;

    if cli.print_config {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    let catalog: Option<Arc<dyn MetadataCatalog>> = match &config.catalog {
        Some(catalog_config) => {
            let client: Arc<dyn MetadataCatalog> = Arc::new(
                TmdbClient::new(catalog_config.clone()).context("Failed to create TMDB client")?,
            );
            info!("Using catalog: {}", client.name());
            Some(client)
        }
        None => {
            warn!("No [catalog] section configured");
            None
        }
    };

    let (events, mut rx) = event_channel(EVENT_BUFFER_SIZE);
    let printer = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to serialize event: {}", e),
            }
        }
    });

    let service = Arc::new(ResolutionService::new(&config, catalog).with_events(events));
    info!(
        strategy = %config.resolver.default_strategy,
        auto_match = !cli.manual,
        groups = cli.titles.len(),
        "Resolving"
    );

    let bulk_id = Uuid::new_v4();
    let canceller = Arc::clone(&service);
    let signal_task = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            canceller.cancel(bulk_id).await;
        }
    });

    let outcome = service
        .bulk_resolve_as(bulk_id, cli.groups(), !cli.manual)
        .await;

    signal_task.abort();
    let _ = signal_task.await;

    // dropping the last handle closes the event channel
    drop(service);
    printer.await.context("Event printer task failed")?;

    println!("{}", serde_json::to_string(&outcome)?);
    info!(
        successful = outcome.successful,
        failed = outcome.failed,
        manual_required = outcome.manual_required,
        cancelled = outcome.cancelled,
        "Done"
    );

    if cli.metrics {
        eprint!("{}", render_metrics()?);
    }

    Ok(())
}

/// Register every collector in a fresh registry and render the text format.
fn render_metrics() -> Result<String> {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

fn load(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_from_env().context("Failed to load config from environment"),
    }
}
