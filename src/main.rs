use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gazette_watcher::background_jobs::{create_scheduler, jobs::GazetteScanJob};
use gazette_watcher::config::ConfigArgs;
use gazette_watcher::server::{metrics, run_admin_server};
use gazette_watcher::{build_pipeline, SqliteRegistry};

#[derive(Parser, Debug)]
#[clap(about = "Watches the official gazette for registered names")]
struct CliArgs {
    #[clap(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    if let Some(path) = &cli_args.config.config {
        info!("Loading configuration from {:?}", path);
    }
    let app_config = cli_args.config.resolve()?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  gazette_url: {}", app_config.gazette_url);
    info!("  poll_interval: {:?}", app_config.poll_interval);
    info!("  metrics_port: {}", app_config.metrics_port);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let registry_path = app_config.registry_db_path();
    info!("Opening SQLite registry at {:?}...", registry_path);
    let registry = Arc::new(SqliteRegistry::new(&registry_path)?);

    let pipeline = Arc::new(build_pipeline(&app_config, registry)?);

    // Set up background job scheduler
    let shutdown_token = CancellationToken::new();
    let (mut scheduler, scheduler_handle) = create_scheduler(shutdown_token.clone());
    scheduler
        .register_job(Arc::new(GazetteScanJob::new(
            pipeline,
            app_config.poll_interval,
        )))
        .await;
    info!(
        "Job scheduler initialized with {} job(s)",
        scheduler.job_count().await
    );

    let admin_server = if app_config.metrics_port > 0 {
        info!("Metrics available at port {}!", app_config.metrics_port);
        let token = shutdown_token.clone();
        let port = app_config.metrics_port;
        Some(tokio::spawn(async move {
            if let Err(e) = run_admin_server(scheduler_handle, port, token.clone()).await {
                error!("Admin server stopped: {:#}", e);
                token.cancel();
            }
        }))
    } else {
        info!("Metrics server disabled");
        None
    };

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C, initiating graceful shutdown");
        signal_token.cancel();
    });

    // Returns once the shutdown token is cancelled and running jobs wound down.
    scheduler.run().await;

    if let Some(server) = admin_server {
        let _ = server.await;
    }
    info!("Shutdown complete");
    Ok(())
}
