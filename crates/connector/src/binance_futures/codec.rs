//! Binance futures channel naming and payload decoding

use serde_json::Value;

use crate::binance_futures::messages::{
    AggTradePayload, CombinedStreamMessage, DepthPayload, KlinePayload,
};
use crate::codec::{parse_f64, ChannelCodec, ControlMethod, DecodeContext, Envelope};
use crate::error::CodecError;
use crate::events::{KlineEvent, MarketEvent, OrderbookEvent, PriceLevel, TradeEvent, TradeSide};
use crate::types::{ChannelKind, WireChannel};

/// Binance USDⓈ-M futures public WebSocket base
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com:443";

const KLINE_SUFFIX: &str = "kline_1m";
const DEPTH_SUFFIX: &str = "depth20@100ms";
const TRADE_SUFFIX: &str = "aggTrade";

const KLINE_PERIOD: &str = "1m";

#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceFuturesCodec;

impl BinanceFuturesCodec {
    fn decode_kline(&self, data: Value, ctx: &DecodeContext<'_>) -> Result<MarketEvent, CodecError> {
        let payload: KlinePayload = serde_json::from_value(data)?;
        let k = payload.kline;
        Ok(MarketEvent::Kline(KlineEvent {
            exchange: ctx.exchange.to_string(),
            symbol: ctx.symbol.to_string(),
            open: parse_f64("k.o", &k.open)?,
            high: parse_f64("k.h", &k.high)?,
            low: parse_f64("k.l", &k.low)?,
            close: parse_f64("k.c", &k.close)?,
            volume: parse_f64("k.q", &k.quote_volume)?,
            timestamp: k.open_time,
            period: KLINE_PERIOD.to_string(),
            received_at: ctx.received_at,
        }))
    }

    /// The depth stream is stamped with local receipt time, not the
    /// exchange's event or transaction time.
    fn decode_orderbook(
        &self,
        data: Value,
        ctx: &DecodeContext<'_>,
    ) -> Result<MarketEvent, CodecError> {
        let payload: DepthPayload = serde_json::from_value(data)?;
        let mut bids = parse_levels("b", &payload.bids)?;
        let mut asks = parse_levels("a", &payload.asks)?;
        bids.truncate(ctx.orderbook_depth);
        asks.truncate(ctx.orderbook_depth);
        Ok(MarketEvent::Orderbook(OrderbookEvent {
            exchange: ctx.exchange.to_string(),
            symbol: ctx.symbol.to_string(),
            bids,
            asks,
            timestamp: ctx.received_at,
            received_at: ctx.received_at,
        }))
    }

    fn decode_trade(&self, data: Value, ctx: &DecodeContext<'_>) -> Result<MarketEvent, CodecError> {
        let payload: AggTradePayload = serde_json::from_value(data)?;
        let side = if payload.is_buyer_maker {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        };
        Ok(MarketEvent::Trade(TradeEvent {
            exchange: ctx.exchange.to_string(),
            symbol: ctx.symbol.to_string(),
            side,
            price: parse_f64("p", &payload.price)?,
            quantity: parse_f64("q", &payload.quantity)?,
            timestamp: payload.trade_time,
            received_at: ctx.received_at,
        }))
    }
}

fn parse_levels(field: &'static str, raw: &[[String; 2]]) -> Result<Vec<PriceLevel>, CodecError> {
    raw.iter()
        .map(|[price, qty]| Ok((parse_f64(field, price)?, parse_f64(field, qty)?)))
        .collect()
}

impl ChannelCodec for BinanceFuturesCodec {
    fn default_endpoint(&self) -> &str {
        BINANCE_FUTURES_WS_URL
    }

    fn channel_suffix(&self, kind: ChannelKind) -> &'static str {
        match kind {
            ChannelKind::Kline => KLINE_SUFFIX,
            ChannelKind::Orderbook => DEPTH_SUFFIX,
            ChannelKind::Trade => TRADE_SUFFIX,
        }
    }

    fn stream_url(&self, base: &str, channels: &[WireChannel]) -> String {
        let streams: Vec<&str> = channels.iter().map(WireChannel::as_str).collect();
        format!("{}/stream?streams={}", base.trim_end_matches('/'), streams.join("/"))
    }

    fn control_message(&self, method: ControlMethod, channels: &[WireChannel], id: u64) -> String {
        serde_json::json!({
            "method": method.as_str(),
            "params": channels,
            "id": id,
        })
        .to_string()
    }

    fn parse_envelope(&self, raw: &[u8]) -> Result<Envelope, CodecError> {
        let value: Value = serde_json::from_slice(raw)?;
        if value.get("stream").is_some() && value.get("data").is_some() {
            let msg: CombinedStreamMessage = serde_json::from_value(value)?;
            return Ok(Envelope::Stream {
                stream: WireChannel::new(msg.stream),
                data: msg.data,
            });
        }
        Ok(Envelope::Control(value))
    }

    fn event_kind(&self, data: &Value) -> Option<ChannelKind> {
        match data.get("e")?.as_str()? {
            "kline" => Some(ChannelKind::Kline),
            "depthUpdate" => Some(ChannelKind::Orderbook),
            "aggTrade" => Some(ChannelKind::Trade),
            _ => None,
        }
    }

    fn decode(
        &self,
        kind: ChannelKind,
        data: Value,
        ctx: &DecodeContext<'_>,
    ) -> Result<MarketEvent, CodecError> {
        match kind {
            ChannelKind::Kline => self.decode_kline(data, ctx),
            ChannelKind::Orderbook => self.decode_orderbook(data, ctx),
            ChannelKind::Trade => self.decode_trade(data, ctx),
        }
    }
}
