//! Publisher for sending canonical events to the transport
//!
//! Events are JSON-encoded and published to
//! `{prefix}.{exchange}.{kind}.{symbol}`. Subjects come from the cached
//! [`SubjectBuilder`], so steady-state publishing formats no strings.

use std::sync::Arc;

use bytes::Bytes;
use mdfeed_middleware::latency::elapsed_since;
use mdfeed_middleware::{now_tsc, SubjectBuilder, Transport, TransportError};

use crate::events::MarketEvent;
use crate::metrics;

pub struct EventPublisher {
    transport: Arc<dyn Transport>,
    subjects: SubjectBuilder,
}

impl EventPublisher {
    pub fn new(transport: Arc<dyn Transport>, subject_prefix: impl Into<String>) -> Self {
        Self {
            transport,
            subjects: SubjectBuilder::new(subject_prefix),
        }
    }

    /// Subject an event is published on
    pub fn subject_for(&self, event: &MarketEvent) -> Arc<str> {
        self.subjects
            .event(event.exchange(), event.kind().as_str(), event.symbol())
    }

    pub async fn publish(&self, event: &MarketEvent) -> Result<(), TransportError> {
        let start = now_tsc();
        let subject = self.subject_for(event);
        let payload = serde_json::to_vec(event)
            .map(Bytes::from)
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?;

        self.transport.publish(&subject, payload).await?;
        metrics::observe_publish(event.exchange(), elapsed_since(start));
        Ok(())
    }
}
