//! Hyperion CLI
//!
//! Daily aggregates of OpenTSDB metrics, read straight from HBase:
//! - Query one metric for one day
//! - Serve the HTTP API
//! - Generate a default config file
//!
//! Logs go to stderr. `RUST_LOG` overrides `logging.level`.

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use hyperion::api::{serve, AppState};
use hyperion::config::{generate_default_config, Config, LoggingConfig};
use hyperion::store::{RestStore, StoreClient};
use hyperion::task::CollectionTask;
use hyperion::uid::UidCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hyperion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily aggregates of OpenTSDB metrics")]
#[command(long_about = "Hyperion reads OpenTSDB data directly from HBase and computes\nper-series avg/max/min for one metric over one UTC day.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// HBase REST gateway URL, overrides the config
    #[arg(long, global = true)]
    pub store: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate one metric over one day
    Query {
        /// Metric name (e.g., sys.cpu.usage)
        metric: String,
        /// UTC day as YYYY-MM-DD (default: yesterday)
        day: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    // Config loading logs before the configured subscriber exists
    let bootstrap = fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || {
        load_config(cli.config.as_deref())
    })?;
    if let Some(url) = cli.store {
        config.store.url = url;
    }
    init_tracing(&config.logging);

    let store: Arc<dyn StoreClient> = Arc::new(
        RestStore::new(config.rest_config()).context("Failed to create store client")?,
    );

    match cli.command {
        Commands::Query { metric, day, json } => {
            let day = day.unwrap_or_else(yesterday);
            tracing::debug!(metric = %metric, day = %day, store = %config.store.url, "running query");

            let task = CollectionTask::new(store, Arc::new(UidCache::new()), config.task_options());
            let results = task.run(&metric, &day).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!("{}", result);
                }
            }
        }

        Commands::Server { host, port } => {
            let mut server_config = config.server_config();
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }

            tracing::info!("Starting Hyperion API server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Store gateway: {}", config.store.url);

            let state = AppState::new(store, config.task_options(), server_config.clone());
            serve(state, &server_config).await?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_with_env(path),
        None => Config::load_default(),
    };
    config.context("Failed to load configuration")
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hyperion={},tower_http={}", level, level)))
}

fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(&logging.level));

    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}

fn yesterday() -> String {
    (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string()
}
