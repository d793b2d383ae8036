//! Application configuration management.

use serde::Deserialize;
use uuid::Uuid;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Posting accounts and stock policy.
    pub ledger: LedgerConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration.
///
/// The three accounts receive the inventory-side journal entries of every posted document.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Inventory (asset) account.
    pub inventory_account_id: Uuid,
    /// Sales revenue account.
    pub sales_revenue_account_id: Uuid,
    /// Cost of goods sold (expense) account.
    pub cogs_account_id: Uuid,
    /// Whether sales may drive stock below zero when the caller does not say otherwise.
    #[serde(default)]
    pub allow_negative_stock: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MAKHZAN").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "0190a1b2-0000-7000-8000-000000000001";
    const REVENUE: &str = "0190a1b2-0000-7000-8000-000000000002";
    const COGS: &str = "0190a1b2-0000-7000-8000-000000000003";

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-nonexistent")),
                ("MAKHZAN__DATABASE__URL", Some("postgres://localhost/makhzan")),
                ("MAKHZAN__LEDGER__INVENTORY_ACCOUNT_ID", Some(INVENTORY)),
                ("MAKHZAN__LEDGER__SALES_REVENUE_ACCOUNT_ID", Some(REVENUE)),
                ("MAKHZAN__LEDGER__COGS_ACCOUNT_ID", Some(COGS)),
                ("MAKHZAN__SERVER__PORT", Some("9090")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/makhzan");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.ledger.inventory_account_id.to_string(), INVENTORY);
                assert_eq!(config.ledger.cogs_account_id.to_string(), COGS);
                assert!(!config.ledger.allow_negative_stock);
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_missing_ledger_accounts_is_an_error() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-nonexistent")),
                ("MAKHZAN__DATABASE__URL", Some("postgres://localhost/makhzan")),
                ("MAKHZAN__LEDGER__INVENTORY_ACCOUNT_ID", None::<&str>),
                ("MAKHZAN__LEDGER__SALES_REVENUE_ACCOUNT_ID", None),
                ("MAKHZAN__LEDGER__COGS_ACCOUNT_ID", None),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
