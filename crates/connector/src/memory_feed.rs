//! In-process feed transport
//!
//! Stands in for the exchange WebSocket in tests and local runs. Each
//! [`InMemoryFeed`] is paired with a [`FeedProbe`] that injects inbound
//! frames and records what the connector sent.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use mdfeed_middleware::now_tsc;

use crate::error::ConnectorError;
use crate::traits::{FeedBuilder, FeedTransport, TimestampedMsg};

const INBOUND_BUFFER: usize = 1024;

/// Transport activity in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Connected(String),
    Sent(String),
    Closed,
}

#[derive(Default)]
struct FeedState {
    events: Vec<FeedEvent>,
    inbound: Option<mpsc::Sender<TimestampedMsg>>,
    fail_connect: bool,
    fail_sends: bool,
}

/// Test-side handle onto one [`InMemoryFeed`]
#[derive(Clone, Default)]
pub struct FeedProbe {
    state: Arc<Mutex<FeedState>>,
}

impl FeedProbe {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a raw frame as if the exchange sent it.
    /// Returns false when the feed is not connected.
    pub async fn push(&self, raw: impl Into<Vec<u8>>) -> bool {
        let inbound = self.lock().inbound.clone();
        let Some(tx) = inbound else {
            return false;
        };
        tx.send((now_tsc(), raw.into())).await.is_ok()
    }

    /// Drop the inbound side without a close, like a remote hang-up
    pub fn disconnect(&self) {
        self.lock().inbound = None;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn events(&self) -> Vec<FeedEvent> {
        self.lock().events.clone()
    }

    /// URL passed to the last successful connect
    pub fn url(&self) -> Option<String> {
        self.lock().events.iter().rev().find_map(|e| match e {
            FeedEvent::Connected(url) => Some(url.clone()),
            _ => None,
        })
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Sent(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, FeedEvent::Closed))
            .count()
    }
}

pub struct InMemoryFeed {
    probe: FeedProbe,
}

impl InMemoryFeed {
    pub fn new() -> (Self, FeedProbe) {
        let probe = FeedProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    /// Feed builder whose probes are collected in creation order
    pub fn builder() -> (FeedBuilder, FeedProbes) {
        let probes = FeedProbes::default();
        let collected = probes.clone();
        let builder: FeedBuilder = Arc::new(move || {
            let (feed, probe) = InMemoryFeed::new();
            collected.push(probe);
            Box::new(feed) as Box<dyn FeedTransport>
        });
        (builder, probes)
    }
}

#[async_trait]
impl FeedTransport for InMemoryFeed {
    async fn connect(&mut self, url: &str) -> Result<mpsc::Receiver<TimestampedMsg>, ConnectorError> {
        let mut state = self.probe.lock();
        if state.fail_connect {
            return Err(ConnectorError::ConnectionFailed(format!("refused: {}", url)));
        }
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        state.inbound = Some(tx);
        state.events.push(FeedEvent::Connected(url.to_string()));
        Ok(rx)
    }

    async fn send(&mut self, text: String) -> Result<(), ConnectorError> {
        let mut state = self.probe.lock();
        if state.inbound.is_none() {
            return Err(ConnectorError::Closed);
        }
        if state.fail_sends {
            return Err(ConnectorError::SendFailed("send refused".to_string()));
        }
        state.events.push(FeedEvent::Sent(text));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        let mut state = self.probe.lock();
        state.inbound = None;
        state.events.push(FeedEvent::Closed);
        Ok(())
    }
}

/// Probes for every feed a builder has produced
#[derive(Clone, Default)]
pub struct FeedProbes {
    probes: Arc<Mutex<Vec<FeedProbe>>>,
}

impl FeedProbes {
    fn push(&self, probe: FeedProbe) {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(probe);
    }

    pub fn get(&self, index: usize) -> Option<FeedProbe> {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.probes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
