use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MetadataError;
use crate::market::MarketConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Nats,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    pub url: Option<String>,
    /// Subject prefix for published events.
    /// If not set, defaults to the environment name.
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

/// Default bind address for the management server
pub const DEFAULT_MANAGE_ADDR: &str = "0.0.0.0:9092";
/// Default delay before the management server starts accepting requests
pub const DEFAULT_MANAGE_START_DELAY_SECS: u64 = 5;

fn default_manage_addr() -> String {
    DEFAULT_MANAGE_ADDR.to_string()
}

fn default_start_delay_secs() -> u64 {
    DEFAULT_MANAGE_START_DELAY_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManageConfig {
    #[serde(default = "default_manage_addr")]
    pub addr: String,
    /// Seconds to wait after startup before binding, so boot-time
    /// connectors are registered before the first request lands.
    #[serde(default = "default_start_delay_secs")]
    pub start_delay_secs: u64,
}

impl Default for ManageConfig {
    fn default() -> Self {
        Self {
            addr: default_manage_addr(),
            start_delay_secs: default_start_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub transport: TransportConfig,
    #[serde(default)]
    pub manage: ManageConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

impl Environment {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        let env: Environment = serde_yaml::from_str(&content)?;
        env.validate()?;
        Ok(env)
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.transport.transport_type == TransportType::Nats && self.transport.url.is_none() {
            return Err(MetadataError::Validation(
                "nats transport requires url".to_string(),
            ));
        }
        for market in &self.markets {
            market.validate()?;
        }
        Ok(())
    }

    /// Subject prefix for the event bus (falls back to the environment name)
    pub fn subject_prefix(&self) -> &str {
        self.transport
            .subject_prefix
            .as_deref()
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name: md-dev
transport:
  type: memory
manage:
  addr: 127.0.0.1:9100
markets:
  - platform: binance_future
    symbols: [BTCUSDT, ETH/USDT]
    channels: [kline, orderbook, trade]
    orderbook_length: 10
"#
        )
        .unwrap();

        let env = Environment::load(file.path()).unwrap();
        assert_eq!(env.name, "md-dev");
        assert_eq!(env.transport.transport_type, TransportType::Memory);
        assert_eq!(env.manage.addr, "127.0.0.1:9100");
        assert_eq!(env.manage.start_delay_secs, DEFAULT_MANAGE_START_DELAY_SECS);
        assert_eq!(env.markets.len(), 1);
        assert_eq!(env.markets[0].symbols, vec!["BTCUSDT", "ETH/USDT"]);
        assert_eq!(env.markets[0].orderbook_length, 10);
        assert_eq!(env.subject_prefix(), "md-dev");
    }

    #[test]
    fn test_manage_defaults_when_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name: md-prod
transport:
  type: nats
  url: nats://localhost:4222
  subject_prefix: prod.md
"#
        )
        .unwrap();

        let env = Environment::load(file.path()).unwrap();
        assert_eq!(env.manage.addr, DEFAULT_MANAGE_ADDR);
        assert!(env.markets.is_empty());
        assert_eq!(env.subject_prefix(), "prod.md");
    }

    #[test]
    fn test_nats_without_url_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name: md-prod
transport:
  type: nats
"#
        )
        .unwrap();

        let err = Environment::load(file.path()).unwrap_err();
        assert!(matches!(err, MetadataError::Validation(_)));
    }

    #[test]
    fn test_invalid_market_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name: md-dev
transport:
  type: memory
markets:
  - platform: binance_future
    symbols: []
    channels: [trade]
"#
        )
        .unwrap();

        assert!(Environment::load(file.path()).is_err());
    }
}
