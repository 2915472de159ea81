/// Database migration runner
///
/// Thin wrapper over sqlx's migration system. Migration files live in the
/// `migrations/` directory of this crate; both the API and the worker run
/// them at startup, and re-running applied migrations is a no-op.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Runs all pending database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    let migrations = sqlx::migrate!("./migrations");

    match migrations.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
