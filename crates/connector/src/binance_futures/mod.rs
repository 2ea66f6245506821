//! Binance USDⓈ-M futures connector
//!
//! Combined-stream WebSocket feed: klines, partial-depth snapshots and
//! aggregated trades. Public market data only, no authentication.

pub mod codec;
pub mod messages;

use std::sync::Arc;

pub use codec::{BinanceFuturesCodec, BINANCE_FUTURES_WS_URL};
pub use messages::{AggTradePayload, CombinedStreamMessage, DepthPayload, KlinePayload};

use crate::connector::StreamConnectorFactory;
use crate::registry::ConnectorRegistry;
use crate::traits::FeedBuilder;

/// Registry key for this exchange variant
pub const EXCHANGE_ID: &str = "binance_future";

/// Register the Binance futures variant, opening feeds with `feed`
pub fn register(registry: &mut ConnectorRegistry, feed: FeedBuilder) {
    registry.register(
        EXCHANGE_ID,
        Arc::new(StreamConnectorFactory::new(BinanceFuturesCodec, feed)),
    );
}
