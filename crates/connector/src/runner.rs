//! Startup of the markets listed in the environment file

use mdfeed_metadata::MarketConfig;
use tracing::{info, warn};

use crate::connector::ConnectorSpec;
use crate::error::{ConfigurationError, RegistryError};
use crate::registry::ConnectorRegistry;
use crate::types::{parse_channel_kinds, parse_symbols};

/// Outcome of [`start_markets`]
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Ids of connectors opened
    pub started: Vec<u64>,
    /// Markets that failed, by platform
    pub failed: Vec<(String, RegistryError)>,
}

/// Turn operator input into a connector spec.
///
/// Unknown channel names are skipped and returned so callers can report
/// them; an empty result set surfaces later as `EmptyChannelSet`.
pub fn build_spec<S: AsRef<str>>(
    exchange: &str,
    endpoint: Option<String>,
    symbols: &[S],
    channels: &[S],
    orderbook_depth: usize,
) -> (ConnectorSpec, Vec<ConfigurationError>) {
    let (kinds, skipped) = parse_channel_kinds(channels);
    let spec = ConnectorSpec {
        exchange: exchange.to_string(),
        endpoint,
        symbols: parse_symbols(symbols),
        kinds,
        orderbook_depth,
    };
    (spec, skipped)
}

/// Open one connector per configured market.
///
/// A failing market is logged and skipped; the others still start.
pub async fn start_markets(registry: &ConnectorRegistry, markets: &[MarketConfig]) -> StartupReport {
    let mut report = StartupReport::default();

    for market in markets {
        let (spec, _skipped) = build_spec(
            &market.platform,
            market.wss.clone(),
            &market.symbols,
            &market.channels,
            market.orderbook_length,
        );

        match registry.create_connector(spec).await {
            Ok(connector) => {
                info!(
                    platform = %market.platform,
                    connector = connector.id(),
                    "Market started"
                );
                report.started.push(connector.id());
            }
            Err(e) => {
                warn!(platform = %market.platform, error = %e, "Failed to start market, skipping");
                report.failed.push((market.platform.clone(), e));
            }
        }
    }

    report
}
