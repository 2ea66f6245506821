//! Per-exchange channel naming and payload decoding
//!
//! A [`ChannelCodec`] holds no state. It maps (symbol, kind) pairs to wire
//! channels and back, builds control frames, and turns exchange payloads
//! into [`MarketEvent`]s.

use serde_json::Value;

use crate::error::CodecError;
use crate::events::MarketEvent;
use crate::types::{ChannelKind, Symbol, WireChannel};

/// Wire control frame method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMethod {
    Subscribe,
    Unsubscribe,
}

impl ControlMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMethod::Subscribe => "SUBSCRIBE",
            ControlMethod::Unsubscribe => "UNSUBSCRIBE",
        }
    }
}

/// An inbound frame split into its routing part and payload
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Market data on a subscribed stream
    Stream { stream: WireChannel, data: Value },
    /// Acknowledgement or other non-data frame
    Control(Value),
}

/// Per-message inputs to [`ChannelCodec::decode`]
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub exchange: &'a str,
    pub symbol: &'a Symbol,
    pub orderbook_depth: usize,
    /// Local receipt time (epoch ms)
    pub received_at: i64,
}

pub trait ChannelCodec: Send + Sync + 'static {
    /// WebSocket base URL used when a market does not override it
    fn default_endpoint(&self) -> &str;

    /// Exchange stream suffix for a kind, e.g. `aggTrade`
    fn channel_suffix(&self, kind: ChannelKind) -> &'static str;

    /// `<lower-case symbol>@<suffix>`
    fn symbol_to_wire_channel(&self, symbol: &Symbol, kind: ChannelKind) -> WireChannel {
        WireChannel::new(format!(
            "{}@{}",
            symbol.as_str().to_ascii_lowercase(),
            self.channel_suffix(kind)
        ))
    }

    /// Recover the kind from a wire channel's suffix; unknown suffixes are errors
    fn wire_channel_to_standard_kind(&self, wire: &WireChannel) -> Result<ChannelKind, CodecError> {
        let (_, suffix) = wire
            .as_str()
            .split_once('@')
            .ok_or_else(|| CodecError::UnknownSuffix(wire.to_string()))?;
        ChannelKind::ALL
            .into_iter()
            .find(|kind| self.channel_suffix(*kind) == suffix)
            .ok_or_else(|| CodecError::UnknownSuffix(wire.to_string()))
    }

    /// URL that opens a feed already subscribed to `channels`
    fn stream_url(&self, base: &str, channels: &[WireChannel]) -> String;

    /// Serialized SUBSCRIBE/UNSUBSCRIBE frame
    fn control_message(&self, method: ControlMethod, channels: &[WireChannel], id: u64) -> String;

    fn parse_envelope(&self, raw: &[u8]) -> Result<Envelope, CodecError>;

    /// Kind named by the payload's embedded event tag, if any
    fn event_kind(&self, data: &Value) -> Option<ChannelKind>;

    fn decode(
        &self,
        kind: ChannelKind,
        data: Value,
        ctx: &DecodeContext<'_>,
    ) -> Result<MarketEvent, CodecError>;
}

/// Parse a decimal string as `f64`, naming the field on failure
pub(crate) fn parse_f64(field: &'static str, value: &str) -> Result<f64, CodecError> {
    value.parse::<f64>().map_err(|_| CodecError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
