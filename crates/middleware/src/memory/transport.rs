use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::latency::now_tsc;
use crate::transport::{Subscription, Transport, TransportMessage};

const SUBJECT_BUFFER: usize = 1024;

/// Process-local event bus: one broadcast channel per exact subject.
/// No wildcard matching.
pub struct InMemoryTransport {
    subjects: DashMap<String, broadcast::Sender<TransportMessage>>,
    published: AtomicU64,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            subjects: DashMap::new(),
            published: AtomicU64::new(0),
        }
    }

    /// Events published since creation, delivered or not
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn sender(&self, subject: &str) -> broadcast::Sender<TransportMessage> {
        self.subjects
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(SUBJECT_BUFFER).0)
            .clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemorySubscription {
    rx: broadcast::Receiver<TransportMessage>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        self.rx
            .recv()
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.published.fetch_add(1, Ordering::Relaxed);
        let msg = TransportMessage {
            subject: subject.to_string(),
            payload,
            timestamp: now_tsc(),
        };
        // No subscribers is not an error for a fan-out bus
        let _ = self.sender(subject).send(msg);
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError> {
        let rx = self.sender(subject).subscribe();
        Ok(Box::new(InMemorySubscription { rx }))
    }
}
