//! Identifiers shared by codecs, connectors and the registry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigurationError;

/// Exchange-agnostic instrument identifier.
///
/// Normalized on construction: separators (`/`, `-`, `_`, `:`, whitespace)
/// are stripped and letters upper-cased, so `btc/usdt` and `BTCUSDT` are the
/// same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Logical data channel, independent of any exchange's naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Kline,
    Orderbook,
    Trade,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Kline, ChannelKind::Orderbook, ChannelKind::Trade];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Kline => "kline",
            ChannelKind::Orderbook => "orderbook",
            ChannelKind::Trade => "trade",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kline" => Ok(ChannelKind::Kline),
            "orderbook" => Ok(ChannelKind::Orderbook),
            "trade" | "aggTrade" => Ok(ChannelKind::Trade),
            other => Err(ConfigurationError::UnknownChannelKind(other.to_string())),
        }
    }
}

/// Exchange-specific subscription key for one (symbol, kind) pair.
///
/// Used both in SUBSCRIBE/UNSUBSCRIBE params and as the demultiplexing key
/// of inbound combined-stream messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireChannel(String);

impl WireChannel {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WireChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse operator-supplied channel names.
///
/// Unknown names are logged and returned alongside the recognized kinds so
/// callers can report them; duplicates (e.g. `trade` + `aggTrade`) collapse.
pub fn parse_channel_kinds<S: AsRef<str>>(
    names: &[S],
) -> (Vec<ChannelKind>, Vec<ConfigurationError>) {
    let mut kinds = Vec::new();
    let mut rejected = Vec::new();
    for name in names {
        match name.as_ref().parse::<ChannelKind>() {
            Ok(kind) => {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            Err(e) => {
                warn!(channel = %name.as_ref(), "Skipping unrecognized channel kind");
                rejected.push(e);
            }
        }
    }
    (kinds, rejected)
}

/// Normalize operator-supplied symbols, dropping empties and duplicates
pub fn parse_symbols<S: AsRef<str>>(raw: &[S]) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for s in raw {
        let symbol = Symbol::new(s.as_ref());
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

/// Cross product of symbols and kinds, symbol-major
pub fn channel_pairs(symbols: &[Symbol], kinds: &[ChannelKind]) -> Vec<(Symbol, ChannelKind)> {
    symbols
        .iter()
        .flat_map(|s| kinds.iter().map(move |k| (s.clone(), *k)))
        .collect()
}
