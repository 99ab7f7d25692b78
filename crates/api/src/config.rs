use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Seconds between outbox passes when nothing wakes the dispatcher (default: `15`).
    pub outbox_poll_interval_secs: u64,
    /// Outbox events claimed per pass (default: `50`).
    pub outbox_batch_size: i64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `OUTBOX_POLL_INTERVAL_SECS` | `15`                    |
    /// | `OUTBOX_BATCH_SIZE`         | `50`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let outbox_poll_interval_secs: u64 = std::env::var("OUTBOX_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("OUTBOX_POLL_INTERVAL_SECS must be a valid u64");

        let outbox_batch_size: i64 = std::env::var("OUTBOX_BATCH_SIZE")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("OUTBOX_BATCH_SIZE must be a valid i64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            outbox_poll_interval_secs,
            outbox_batch_size,
            jwt,
        }
    }
}
