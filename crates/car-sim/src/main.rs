#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Car command service simulator.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use car_sim::{http, CarSimService, SimConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "car-sim")]
struct Args {
    /// Listen address, e.g. 127.0.0.1:3000
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Number of polls a command reports `InProgress` before finishing.
    #[arg(long, default_value_t = 3)]
    in_progress_polls: u32,

    /// Log level (env-filter syntax).
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(args.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let svc = Arc::new(CarSimService::new(SimConfig {
        in_progress_polls: args.in_progress_polls,
    }));
    let app = http::router(svc);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("bind {}", args.listen))?;
    tracing::info!(listen = %args.listen, "car-sim starting");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
