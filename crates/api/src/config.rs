//! Server configuration from environment variables.

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_FILTER: &str = "info";

/// Runtime configuration for the API server.
///
/// Every knob has a default, so a bare `api` invocation starts a working
/// server on the in-memory store. Settings:
/// - `HOST`, `PORT` — bind address
/// - `RUST_LOG` — tracing filter directive
/// - `DATABASE_URL` — PostgreSQL connection string; when absent the
///   server falls back to the in-memory store
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Reads the environment, substituting defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", DEFAULT_HOST),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            log_filter: env_or("RUST_LOG", DEFAULT_LOG_FILTER),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// The `host:port` string to bind the listener to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stand_alone() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.log_filter, "info");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn addr_combines_host_and_port() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
