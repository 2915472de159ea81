/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: migration runner over the `migrations/` directory
///
/// Models live in the `models` module at the crate root.

pub mod migrations;
pub mod pool;
