#![doc = include_str!("../README.md")]

mod driver;

use clap::Parser;
use driver::config::{CliArgs, DemoConfig};
use driver::scenario;
use driver::telemetry::init_telemetry;
use tidepool::{Pool, SimulatedWork};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let pool = Pool::with_handler(config.pool.clone(), SimulatedWork::new(config.job_latency));

    tokio::select! {
        () = scenario::run(&pool, &config) => {}
        () = shutdown_signal() => {
            tracing::info!("Interrupted, skipping the rest of the walkthrough");
        }
    }

    tracing::info!("Shutting down pool...");
    pool.shutdown().await;
    tracing::info!("Pool shutdown complete.");
    Ok(())
}

fn log_startup_info(config: &DemoConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting demo with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting demo with a queue of {} jobs and {} initial workers",
            config.pool.buffer_size(),
            config.initial_workers
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
