//! # BountyBoard Worker
//!
//! Maintenance process for the BountyBoard tracker. Runs three recurring
//! jobs against the shared database:
//!
//! - Hourly deadline scan: warns assignees of approaching and overdue tasks
//! - Daily license expiry sweep: deactivates expired licenses, warns creators
//! - Daily notification cleanup: deletes notifications older than 30 days
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p bountyboard-worker
//! ```

use bountyboard_shared::db;
use bountyboard_worker::{config::WorkerConfig, scheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bountyboard_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "BountyBoard Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = db::pool::create_pool(db::pool::DatabaseConfig {
        url: config.database_url.clone(),
        ..Default::default()
    })
    .await?;
    tracing::info!("Database pool established");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
        tracing::info!("Shutdown signal received");
    };

    scheduler::run(pool, config, shutdown).await;

    tracing::info!("Worker stopped");
    Ok(())
}
