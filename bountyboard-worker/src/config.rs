/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DEADLINE_SCAN_INTERVAL_SECONDS`: deadline scan cadence (default: 3600)
/// - `DAILY_JOB_INTERVAL_SECONDS`: cadence for the daily jobs (default: 86400)
/// - `RUST_LOG`: log level (default: info)

use std::env;
use std::time::Duration;

/// Worker process configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// How often the deadline scan runs
    pub deadline_scan_interval: Duration,

    /// How often the daily jobs (license expiry, notification cleanup) run
    pub daily_job_interval: Duration,
}

impl WorkerConfig {
    /// Loads worker configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let deadline_scan_interval = interval_from_env("DEADLINE_SCAN_INTERVAL_SECONDS", 3600)?;
        let daily_job_interval = interval_from_env("DAILY_JOB_INTERVAL_SECONDS", 86400)?;

        Ok(Self {
            database_url,
            deadline_scan_interval,
            daily_job_interval,
        })
    }
}

fn interval_from_env(var: &str, default_seconds: u64) -> anyhow::Result<Duration> {
    let seconds = match env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("{} is not a valid number of seconds: {}", var, e))?,
        Err(_) => default_seconds,
    };

    if seconds == 0 {
        anyhow::bail!("{} must be positive", var);
    }

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_default() {
        let interval = interval_from_env("NONEXISTENT_INTERVAL_VAR", 3600).unwrap();
        assert_eq!(interval, Duration::from_secs(3600));
    }
}
