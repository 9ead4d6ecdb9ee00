use anyhow::{Context, Result};
use churn_service::{start_server, AppState, LogFormat, ServiceConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "churn-service")]
#[command(author = "Churn Pipeline Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP prediction service for churn model artifacts", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Model artifact path (overrides configuration)
    #[arg(short, long)]
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model) = args.model {
        config.model_path = model;
    }

    init_logging(&config);

    info!("Churn prediction service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        model = %config.model_path.display(),
        fail_fast = config.fail_fast,
        reject_unknown_categories = config.reject_unknown_categories,
        "starting"
    );

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(err) => {
            error!("{err}");
            return Err(err).context("Model artifact could not be loaded");
        }
    };

    start_server(state, &config.bind_addr()).await?;
    info!("prediction service stopped");
    Ok(())
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}
