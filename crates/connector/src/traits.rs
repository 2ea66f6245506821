use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::connector::{ConnectorSpec, ConnectorState};
use crate::error::{ConnectorError, RegistryError};
use crate::publisher::EventPublisher;
use crate::types::{ChannelKind, Symbol, WireChannel};

/// Inbound frame paired with its receipt TSC
pub type TimestampedMsg = (u64, Vec<u8>);

/// Full-duplex transport to an exchange stream (WebSocket, in-memory, etc.)
#[async_trait]
pub trait FeedTransport: Send {
    /// Open the stream and hand back the inbound frame receiver.
    /// The receiver yields `None` once the remote side goes away.
    async fn connect(&mut self, url: &str) -> Result<mpsc::Receiver<TimestampedMsg>, ConnectorError>;

    /// Send a text control frame
    async fn send(&mut self, text: String) -> Result<(), ConnectorError>;

    /// Close the stream. Calling it on a closed transport is a no-op.
    async fn close(&mut self) -> Result<(), ConnectorError>;
}

/// Produces a fresh transport for each new connector
pub type FeedBuilder = Arc<dyn Fn() -> Box<dyn FeedTransport> + Send + Sync>;

/// One open exchange connection and the channels it carries
#[async_trait]
pub trait MarketConnector: Send + Sync {
    fn id(&self) -> u64;

    fn exchange(&self) -> &str;

    /// Wire channel this connector uses for a (symbol, kind) pair
    fn wire_channel(&self, symbol: &Symbol, kind: ChannelKind) -> WireChannel;

    fn state(&self) -> ConnectorState;

    fn is_closed(&self) -> bool {
        self.state() == ConnectorState::Closed
    }

    /// Channels currently live on this connection
    async fn active_channels(&self) -> BTreeSet<WireChannel>;

    /// Add pairs to the live set. Returns only the channels that were newly added.
    async fn subscribe(
        &self,
        pairs: &[(Symbol, ChannelKind)],
    ) -> Result<Vec<WireChannel>, ConnectorError>;

    /// Remove pairs from the live set. Closes the connection when nothing is left.
    /// Returns the channels that were actually removed.
    async fn unsubscribe(
        &self,
        pairs: &[(Symbol, ChannelKind)],
    ) -> Result<Vec<WireChannel>, ConnectorError>;

    async fn close(&self);
}

/// Builds connectors for one exchange
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn create(
        &self,
        id: u64,
        spec: ConnectorSpec,
        publisher: Arc<EventPublisher>,
    ) -> Result<Arc<dyn MarketConnector>, RegistryError>;
}
