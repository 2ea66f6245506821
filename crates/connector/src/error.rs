use thiserror::Error;

use mdfeed_middleware::TransportError;

use crate::types::{ChannelKind, Symbol, WireChannel};

/// Setup-time problems with requested channels. Logged and skipped; never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unrecognized channel kind: {0}")]
    UnknownChannelKind(String),
    #[error("no symbol/channel pairs requested")]
    EmptyChannelSet,
}

/// Feed transport failures
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("connector closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid number in field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("unrecognized channel suffix in {0}")]
    UnknownSuffix(String),
}

/// Outcome of handling one inbound feed message that produced no event
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("unrecognized stream: {0}")]
    UnrecognizedChannel(WireChannel),
    #[error("stream {0} is no longer subscribed")]
    InactiveChannel(WireChannel),
    #[error("unsupported event {tag:?} on stream {stream}")]
    UnsupportedEvent { stream: WireChannel, tag: Option<String> },
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("publish failed: {0}")]
    Publish(#[from] TransportError),
    #[error("connector closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("channel already exists: {exchange} {symbol} {kind}")]
    DuplicateSubscription {
        exchange: String,
        symbol: Symbol,
        kind: ChannelKind,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}
