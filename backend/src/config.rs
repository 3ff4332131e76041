//! Configuration management for the FarmGate backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FG_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration for the identity context
    pub jwt: JwtConfig,

    /// Trip optimizer configuration
    pub optimizer: OptimizerConfig,

    /// Pickup scheduling configuration
    pub pickup: PickupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying bearer tokens issued by the identity service
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OptimizerConfig {
    /// Trip optimizer base URL
    pub base_url: String,

    /// Request timeout in seconds; on expiry route assembly fails without
    /// creating any route state
    pub timeout_seconds: u64,

    /// Collection hub latitude
    pub hub_latitude: f64,

    /// Collection hub longitude
    pub hub_longitude: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PickupConfig {
    /// Daily departure time of collection vehicles, HH:MM
    pub departure_time: String,

    /// Bookings may be cancelled until this many hours before departure
    pub cancellation_cutoff_hours: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FG_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("optimizer.timeout_seconds", 10)?
            .set_default("pickup.departure_time", "06:00")?
            .set_default("pickup.cancellation_cutoff_hours", 12)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FG_ prefix)
            .add_source(
                Environment::with_prefix("FG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
