use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Default number of price levels kept per orderbook side
pub const DEFAULT_ORDERBOOK_LENGTH: usize = 20;

fn default_orderbook_length() -> usize {
    DEFAULT_ORDERBOOK_LENGTH
}

/// One exchange connection started at boot.
///
/// Channel names are kept as strings here; unknown names are reported
/// (and skipped) by the connector when the market is started, not at load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Registered exchange variant, e.g. "binance_future"
    pub platform: String,
    /// WebSocket base URL override (None = variant default)
    #[serde(default)]
    pub wss: Option<String>,
    pub symbols: Vec<String>,
    pub channels: Vec<String>,
    #[serde(default = "default_orderbook_length")]
    pub orderbook_length: usize,
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.platform.trim().is_empty() {
            return Err(MetadataError::Validation("market platform is empty".into()));
        }
        if self.symbols.is_empty() {
            return Err(MetadataError::invalid_market(&self.platform, "no symbols"));
        }
        if self.channels.is_empty() {
            return Err(MetadataError::invalid_market(&self.platform, "no channels"));
        }
        if self.orderbook_length == 0 {
            return Err(MetadataError::invalid_market(
                &self.platform,
                "orderbook_length must be at least 1",
            ));
        }
        Ok(())
    }
}
