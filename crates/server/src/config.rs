use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Timeout-sweep interval (default: `30` seconds). Must stay below
    /// the shortest job timeout.
    pub sweep_interval: Duration,
    /// Deadline for each preprocessing job (default: `900` seconds).
    pub preprocess_timeout: Duration,
    /// Deadline for the final comparison job (default: `900` seconds).
    pub comparison_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default      |
    /// |---------------------------|--------------|
    /// | `DATABASE_URL`            | *(required)* |
    /// | `SWEEP_INTERVAL_SECS`     | `30`         |
    /// | `PREPROCESS_TIMEOUT_SECS` | `900`        |
    /// | `COMPARISON_TIMEOUT_SECS` | `900`        |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        Self {
            database_url,
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS", 30),
            preprocess_timeout: env_secs("PREPROCESS_TIMEOUT_SECS", 900),
            comparison_timeout: env_secs("COMPARISON_TIMEOUT_SECS", 900),
        }
    }
}

fn env_secs(var: &str, default: u64) -> Duration {
    let secs: u64 = std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid u64"));
    Duration::from_secs(secs)
}
