//! Binance futures combined-stream message types
//!
//! Field names follow Binance's single-letter keys. Numeric values arrive as
//! strings and are parsed by the codec.

use serde::Deserialize;
use serde_json::Value;

/// Combined-stream envelope: `{"stream":"btcusdt@aggTrade","data":{...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedStreamMessage {
    pub stream: String,
    pub data: Value,
}

/// Kline stream payload (`e: "kline"`)
#[derive(Debug, Clone, Deserialize)]
pub struct KlinePayload {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: KlineData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineData {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    /// Base asset volume
    #[serde(rename = "v")]
    pub base_volume: String,
    /// Quote asset volume
    #[serde(rename = "q")]
    pub quote_volume: String,
    #[serde(rename = "x")]
    pub is_closed: bool,
}

/// Partial depth payload (`e: "depthUpdate"`) from `@depth<N>@100ms`
#[derive(Debug, Clone, Deserialize)]
pub struct DepthPayload {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Transaction time
    #[serde(rename = "T", default)]
    pub transaction_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    pub asks: Vec<[String; 2]>,
}

/// Aggregated trade payload (`e: "aggTrade"`)
#[derive(Debug, Clone, Deserialize)]
pub struct AggTradePayload {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Buyer was the maker, i.e. the aggressor sold
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGG_TRADE: &str = r#"{"stream":"btcusdt@aggTrade","data":{"e":"aggTrade","E":1690000000005,"s":"BTCUSDT","a":5933014,"p":"100.5","q":"0.01","f":100,"l":105,"T":1690000000000,"m":true}}"#;
    const KLINE: &str = r#"{"e":"kline","E":1690000000100,"s":"ETHUSDT","k":{"t":1689999960000,"T":1690000019999,"s":"ETHUSDT","i":"1m","f":1,"L":2,"o":"1850.10","c":"1851.00","h":"1852.25","l":"1849.90","v":"120.5","n":42,"x":false,"q":"223100.75","V":"60.1","Q":"111000.0","B":"0"}}"#;
    const DEPTH: &str = r#"{"e":"depthUpdate","E":1690000000200,"T":1690000000190,"s":"BTCUSDT","U":1,"u":2,"pu":0,"b":[["29999.9","1.5"],["29999.8","0.2"]],"a":[["30000.0","0.7"]]}"#;

    #[test]
    fn test_parse_combined_stream() {
        let msg: CombinedStreamMessage = serde_json::from_str(AGG_TRADE).unwrap();
        assert_eq!(msg.stream, "btcusdt@aggTrade");
        let trade: AggTradePayload = serde_json::from_value(msg.data).unwrap();
        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.price, "100.5");
        assert_eq!(trade.quantity, "0.01");
        assert_eq!(trade.trade_time, 1690000000000);
        assert!(trade.is_buyer_maker);
    }

    #[test]
    fn test_parse_kline() {
        let kline: KlinePayload = serde_json::from_str(KLINE).unwrap();
        assert_eq!(kline.event_type, "kline");
        assert_eq!(kline.kline.interval, "1m");
        assert_eq!(kline.kline.open_time, 1689999960000);
        assert_eq!(kline.kline.quote_volume, "223100.75");
        assert!(!kline.kline.is_closed);
    }

    #[test]
    fn test_parse_depth() {
        let depth: DepthPayload = serde_json::from_str(DEPTH).unwrap();
        assert_eq!(depth.event_type, "depthUpdate");
        assert_eq!(depth.transaction_time, Some(1690000000190));
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[0], ["29999.9".to_string(), "1.5".to_string()]);
        assert_eq!(depth.asks.len(), 1);
    }

    #[test]
    fn test_depth_without_transaction_time() {
        let json = r#"{"e":"depthUpdate","E":1,"s":"BTCUSDT","b":[],"a":[]}"#;
        let depth: DepthPayload = serde_json::from_str(json).unwrap();
        assert!(depth.transaction_time.is_none());
        assert!(depth.bids.is_empty());
    }
}
