//! Indexer configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`), collected once at startup into [`IndexerConfig`]. The module
//! address and database URL are mandatory; everything else has a default.

use rust_decimal::Decimal;

/// Chain network the indexer runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Aptos mainnet.
    Mainnet,
    /// Aptos testnet.
    Testnet,
    /// Aptos devnet.
    Devnet,
}

impl Network {
    /// Returns the GraphQL endpoint of the network's indexer API.
    #[must_use]
    pub const fn indexer_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.aptoslabs.com/v1/graphql",
            Self::Testnet => "https://api.testnet.aptoslabs.com/v1/graphql",
            Self::Devnet => "https://api.devnet.aptoslabs.com/v1/graphql",
        }
    }

    /// Returns the network name as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Top-level indexer configuration.
///
/// Loaded once at startup via [`IndexerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Network the indexer runs against.
    pub network: Network,

    /// Address of the launchpad Move module. Events are filtered by
    /// `<module_addr>::pump::<event>` and the module address itself holds
    /// each token's unsold bonding-curve reserve.
    pub module_addr: String,

    /// GraphQL endpoint of the chain indexer API.
    pub indexer_url: String,

    /// PostgreSQL connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Virtual base-reserve level at which a token is permanently flagged
    /// as a legend.
    pub legend_target_cap: Decimal,

    /// Maximum number of events fetched per handler cycle.
    pub batch_size: i64,

    /// Sleep between ingestion cycles, in milliseconds.
    pub poll_interval_ms: u64,

    /// Per-handler time budget per cycle, in milliseconds.
    pub handler_timeout_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            module_addr: String::new(),
            indexer_url: Network::Testnet.indexer_url().to_string(),
            database_url: String::new(),
            database_max_connections: 20,
            legend_target_cap: Decimal::from(100_000_000_000_i64),
            batch_size: 1000,
            poll_interval_ms: 500,
            handler_timeout_ms: 30_000,
        }
    }
}

impl IndexerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `MODULE_ADDR` or `DATABASE_URL` is
    /// absent, `NETWORK` names an unknown network, or a numeric setting
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let network: Network = std::env::var("NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()?;

        let module_addr =
            std::env::var("MODULE_ADDR").unwrap_or_default();
        if module_addr.is_empty() {
            return Err(ConfigError::MissingModuleAddr);
        }

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let indexer_url = std::env::var("INDEXER_URL")
            .unwrap_or_else(|_| network.indexer_url().to_string());

        let config = Self {
            network,
            module_addr,
            indexer_url,
            database_url,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 20),
            legend_target_cap: parse_env(
                "LEGEND_TARGET_CAP_APTOS",
                Decimal::from(100_000_000_000_i64),
            ),
            batch_size: parse_env("BATCH_SIZE", 1000),
            poll_interval_ms: parse_env("POLL_INTERVAL_MS", 500),
            handler_timeout_ms: parse_env("HANDLER_TIMEOUT_MS", 30_000),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a numeric setting is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size <= 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        if self.handler_timeout_ms == 0 {
            return Err(ConfigError::InvalidHandlerTimeout);
        }

        Ok(())
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `MODULE_ADDR` is not set or empty.
    #[error("MODULE_ADDR must be provided")]
    MissingModuleAddr,

    /// `DATABASE_URL` is not set.
    #[error("DATABASE_URL must be provided")]
    MissingDatabaseUrl,

    /// `NETWORK` names an unknown network.
    #[error("unknown network: {0}")]
    InvalidNetwork(String),

    /// `BATCH_SIZE` must be positive.
    #[error("BATCH_SIZE must be > 0")]
    InvalidBatchSize,

    /// `POLL_INTERVAL_MS` must be positive.
    #[error("POLL_INTERVAL_MS must be > 0")]
    InvalidPollInterval,

    /// `HANDLER_TIMEOUT_MS` must be positive.
    #[error("HANDLER_TIMEOUT_MS must be > 0")]
    InvalidHandlerTimeout,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = IndexerConfig::default();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.handler_timeout_ms, 30_000);
        assert_eq!(
            config.legend_target_cap,
            Decimal::from(100_000_000_000_i64)
        );
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("mainnet".parse::<Network>().ok(), Some(Network::Mainnet));
        assert_eq!("testnet".parse::<Network>().ok(), Some(Network::Testnet));
        assert_eq!("devnet".parse::<Network>().ok(), Some(Network::Devnet));
        assert!("localnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_indexer_url() {
        assert!(Network::Mainnet.indexer_url().contains("mainnet"));
        assert!(Network::Testnet.indexer_url().contains("testnet"));
        assert!(Network::Devnet.indexer_url().contains("devnet"));
    }

    #[test]
    fn test_validate_valid() {
        let config = IndexerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_batch_size() {
        let config = IndexerConfig {
            batch_size: 0,
            ..IndexerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_poll_interval() {
        let config = IndexerConfig {
            poll_interval_ms: 0,
            ..IndexerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_handler_timeout() {
        let config = IndexerConfig {
            handler_timeout_ms: 0,
            ..IndexerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_display() {
        assert_eq!(Network::Mainnet.to_string(), "mainnet");
    }
}
