//! mdfeed-connector: Exchange market data connectors
//!
//! Connects to exchange WebSocket feeds, normalizes trades, orderbooks and
//! klines into canonical events, and lets channels be added or removed on
//! running connections through the management API.

pub mod binance_futures;
pub mod codec;
pub mod connector;
pub mod error;
pub mod events;
pub mod memory_feed;
pub mod metrics;
pub mod publisher;
pub mod registry;
pub mod runner;
pub mod server;
pub mod traits;
pub mod types;
pub mod websocket;

pub use codec::{ChannelCodec, ControlMethod, DecodeContext, Envelope};
pub use connector::{ConnectorSpec, ConnectorState, StreamConnector, StreamConnectorFactory};
pub use error::{CodecError, ConfigurationError, ConnectorError, MessageError, RegistryError};
pub use events::{KlineEvent, MarketEvent, OrderbookEvent, PriceLevel, TradeEvent, TradeSide};
pub use memory_feed::{FeedEvent, FeedProbe, FeedProbes, InMemoryFeed};
pub use publisher::EventPublisher;
pub use registry::{ConnectorRegistry, ConnectorSummary};
pub use runner::{build_spec, start_markets, StartupReport};
pub use server::{create_router, run_server, ManagementState};
pub use traits::{ConnectorFactory, FeedBuilder, FeedTransport, MarketConnector, TimestampedMsg};
pub use types::{ChannelKind, Symbol, WireChannel};
pub use websocket::WebSocketFeed;
