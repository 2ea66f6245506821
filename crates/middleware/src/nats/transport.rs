use async_nats::Client;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::TransportError;
use crate::latency::now_tsc;
use crate::transport::{Subscription, Transport, TransportMessage};

struct NatsSubscription {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        let msg = self
            .subscriber
            .next()
            .await
            .ok_or_else(|| TransportError::SubscribeFailed("subscription closed".to_string()))?;

        Ok(TransportMessage {
            subject: msg.subject.to_string(),
            payload: msg.payload,
            timestamp: now_tsc(),
        })
    }
}

/// Core NATS publisher for canonical market events
pub struct NatsTransport {
    client: Client,
}

impl NatsTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| TransportError::PublishFailed(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;
        Ok(Box::new(NatsSubscription { subscriber }))
    }
}
