//! Canonical market events
//!
//! Every exchange variant decodes into these types. Field names are the
//! public contract consumed from the event bus and must stay stable.

use serde::{Deserialize, Serialize};

use crate::types::ChannelKind;

/// Trade direction of the aggressor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// (price, quantity), serialized as a two-element array
pub type PriceLevel = (f64, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineEvent {
    pub exchange: String,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Candle open time (epoch ms)
    pub timestamp: i64,
    /// Candle interval, e.g. "1m"
    pub period: String,
    /// Local receipt time (epoch ms)
    pub received_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookEvent {
    pub exchange: String,
    pub symbol: String,
    /// Best (highest) bid first
    pub bids: Vec<PriceLevel>,
    /// Best (lowest) ask first
    pub asks: Vec<PriceLevel>,
    pub timestamp: i64,
    pub received_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub exchange: String,
    pub symbol: String,
    pub side: TradeSide,
    pub price: f64,
    pub quantity: f64,
    /// Exchange trade time (epoch ms)
    pub timestamp: i64,
    pub received_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    Kline(KlineEvent),
    Orderbook(OrderbookEvent),
    Trade(TradeEvent),
}

impl MarketEvent {
    pub fn kind(&self) -> ChannelKind {
        match self {
            MarketEvent::Kline(_) => ChannelKind::Kline,
            MarketEvent::Orderbook(_) => ChannelKind::Orderbook,
            MarketEvent::Trade(_) => ChannelKind::Trade,
        }
    }

    pub fn exchange(&self) -> &str {
        match self {
            MarketEvent::Kline(e) => &e.exchange,
            MarketEvent::Orderbook(e) => &e.exchange,
            MarketEvent::Trade(e) => &e.exchange,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Kline(e) => &e.symbol,
            MarketEvent::Orderbook(e) => &e.symbol,
            MarketEvent::Trade(e) => &e.symbol,
        }
    }
}
