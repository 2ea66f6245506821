use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// One event as a bus subscriber sees it
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub subject: String,
    pub payload: Bytes,
    /// TSC timestamp taken when the message reached this side of the bus
    pub timestamp: u64,
}

/// Receiving end of a subject subscription. Dropping it unsubscribes.
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Wait for the next message on the subject
    async fn next(&mut self) -> Result<TransportMessage, TransportError>;
}

/// Fan-out event bus the gateway publishes canonical events to
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget publish of one encoded event
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError>;

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError>;
}
