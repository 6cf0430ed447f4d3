//! HAVEN demo binary
//!
//! Boots a seeded engine, prints notifications to the log, and runs the
//! environment simulator until interrupted.

use anyhow::Result;
use haven_engine::Controller;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting HAVEN");

    let controller = Controller::seeded().await;
    controller.on_notification(|title, body| {
        info!(%title, %body, "Notification");
    });
    controller.start();

    info!(
        devices = controller.list_devices().len(),
        rules = controller.list_rules().len(),
        "HAVEN is running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    controller.stop();

    Ok(())
}
