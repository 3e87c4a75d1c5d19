//! Configuration management for the dreams manager service.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). The configuration is parsed once and shared process-wide.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    /// Prefix for the page links rendered in paginated reports.
    pub report_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "127.0.0.1"),
                port: env_or("PORT", "5001").parse().unwrap_or(5001),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "./data/dreamsmanager.db"),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", "10")
                    .parse()
                    .unwrap_or(10),
            },
            pagination: PaginationConfig {
                default_page_size: env_or("DEFAULT_PAGE_SIZE", "10").parse().unwrap_or(10),
                report_base_url: env_or("REPORT_BASE_URL", "/dashboard/admin"),
            },
            logging: LoggingConfig {
                format: env_or("LOG_FORMAT", "pretty")
                    .parse()
                    .unwrap_or(LogFormat::Pretty),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
