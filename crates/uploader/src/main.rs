#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Car uploader: submits selected models to a car one at a time and follows
//! each command until it finishes.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use car_upload_core::model::Car;
use car_upload_core::session::UploadSession;
use car_uploader::config::{Cli, Settings};
use car_uploader::http_client::HttpCommandClient;
use car_uploader::render;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&cli.log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::resolve(&cli)?;
    if settings.models.is_empty() {
        tracing::warn!("no models selected; nothing will be uploaded");
    }

    if settings.clear_first {
        let labels: Vec<&str> = settings.cars.iter().map(Car::label).collect();
        tracing::warn!(cars = ?labels, "all models on these cars will be deleted before uploading");
        if !cli.yes && !confirm_clear(&settings.cars)? {
            anyhow::bail!("model pre-clear not confirmed; nothing was changed");
        }
    }

    let client = Arc::new(HttpCommandClient::new(
        settings.service_url.clone(),
        settings.request_timeout,
    )?);
    let session = UploadSession::new(client, settings.plan(), settings.session_config())
        .context("invalid upload session")?;

    tracing::info!(
        session_id = %session.id(),
        service = %settings.service_url,
        car = %session.snapshot().car.instance_id,
        models = settings.models.len(),
        clear_first = settings.clear_first,
        "starting upload session"
    );

    let handle = session.start();
    let mut snapshots = handle.snapshots();
    print!("{}", render::render(&snapshots.borrow_and_update()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print!("{}", render::render(&snapshot));
                if snapshot.is_finished() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                tracing::warn!("interrupted; cancelling upload session");
                handle.cancel();
            }
        }
    }

    let last = handle.wait().await;
    let failed = render::unsuccessful(&last.records);
    if last.cancelled {
        anyhow::bail!("upload session cancelled with {} model(s) not sent", last.remaining);
    }
    if !failed.is_empty() {
        for r in &failed {
            tracing::warn!(model = %r.model_name, command_id = %r.command_id, status = %r.status, "upload did not succeed");
        }
        anyhow::bail!("{} of {} upload(s) did not succeed", failed.len(), last.records.len());
    }

    tracing::info!(uploaded = last.records.len(), "all uploads succeeded");
    Ok(())
}

fn confirm_clear(cars: &[Car]) -> anyhow::Result<bool> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", render::clear_prompt(cars))?;
    stderr.flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read confirmation")?;
    Ok(render::is_confirmed(&answer))
}
