//! Application configuration management.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// External ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Exchange-rate configuration.
    #[serde(default)]
    pub rates: RateConfig,
    /// Local projection cache configuration.
    #[serde(default)]
    pub projection: ProjectionConfig,
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// External ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How long a submission waits for confirmation before the outcome is unknown.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    /// Upper bound on milestones read in one batch.
    #[serde(default = "default_milestone_capacity")]
    pub milestone_capacity: usize,
    /// Optional JSON seed for the in-memory development ledger.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_milestone_capacity() -> usize {
    10
}

impl LedgerConfig {
    /// Confirmation timeout as a `Duration`.
    #[must_use]
    pub const fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: default_confirmation_timeout(),
            milestone_capacity: default_milestone_capacity(),
            seed_path: None,
        }
    }
}

/// Exchange-rate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    /// Currency amounts are entered and displayed in.
    #[serde(default = "default_display_currency")]
    pub display_currency: Currency,
    /// Base URL of the exchange-rate oracle.
    #[serde(default = "default_oracle_url")]
    pub oracle_url: String,
    /// Ticker of the ledger's native unit at the oracle.
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// How long a fetched rate stays usable.
    #[serde(default = "default_rate_ttl")]
    pub ttl_secs: u64,
    /// Interval between oracle polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_display_currency() -> Currency {
    Currency::Myr
}

fn default_oracle_url() -> String {
    "https://api.coinbase.com".to_string()
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_rate_ttl() -> u64 {
    300 // 5 minutes
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            display_currency: default_display_currency(),
            oracle_url: default_oracle_url(),
            native_symbol: default_native_symbol(),
            ttl_secs: default_rate_ttl(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Local projection cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    /// Projections older than this are evicted and re-read on next access.
    #[serde(default = "default_projection_ttl")]
    pub ttl_secs: u64,
}

fn default_projection_ttl() -> u64 {
    600 // 10 minutes
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_projection_ttl(),
        }
    }
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
            .add_source(config::Environment::with_prefix("FUNDRELEASE").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.ledger.milestone_capacity == 0 {
            return Err(config::ConfigError::Message(
                "ledger.milestone_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "FUNDRELEASE__SERVER__PORT",
                "FUNDRELEASE__LEDGER__CONFIRMATION_TIMEOUT_SECS",
                "FUNDRELEASE__RATES__DISPLAY_CURRENCY",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.ledger.confirmation_timeout_secs, 120);
                assert_eq!(config.ledger.milestone_capacity, 10);
                assert_eq!(config.rates.display_currency, Currency::Myr);
                assert_eq!(config.rates.native_symbol, "ETH");
                assert_eq!(config.projection.ttl_secs, 600);
            },
        );
    }

    #[test]
    fn test_zero_milestone_capacity_rejected() {
        temp_env::with_var("FUNDRELEASE__LEDGER__MILESTONE_CAPACITY", Some("0"), || {
            let err = AppConfig::load().unwrap_err();
            assert!(err.to_string().contains("milestone_capacity"));
        });
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("FUNDRELEASE__SERVER__PORT", Some("9090")),
                ("FUNDRELEASE__LEDGER__CONFIRMATION_TIMEOUT_SECS", Some("30")),
                ("FUNDRELEASE__RATES__DISPLAY_CURRENCY", Some("USD")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9090);
                assert_eq!(
                    config.ledger.confirmation_timeout(),
                    Duration::from_secs(30)
                );
                assert_eq!(config.rates.display_currency, Currency::Usd);
            },
        );
    }
}
