//! Configuration module for the exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address, telemetry path)
//! - Database settings (DSN, pool size, version cache)
//! - Scrape settings (namespace, deadlines, gate policy, probe toggles)

mod app;
mod validation;

pub use app::{AppConfig, DatabaseConfig, ScrapeConfig, ServerConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};

// Re-export constants
pub use app::{DEFAULT_PORT, DEFAULT_SCRAPE_TIMEOUT, DEFAULT_TIMEOUT_OFFSET};
