//! Connector registry
//!
//! Maps exchange ids to factories and owns every live connector. One lock
//! guards the connector list; each connector has its own lock for its
//! channel set. Closed connectors are pruned before every operation.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::connector::{ConnectorSpec, ConnectorState};
use crate::error::{ConfigurationError, RegistryError};
use crate::metrics;
use crate::publisher::EventPublisher;
use crate::traits::{ConnectorFactory, MarketConnector};
use crate::types::{channel_pairs, ChannelKind, Symbol, WireChannel};

type ConnectorList = Vec<Arc<dyn MarketConnector>>;

/// Point-in-time view of one connector
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorSummary {
    pub id: u64,
    pub exchange: String,
    pub state: ConnectorState,
    pub channels: Vec<WireChannel>,
}

pub struct ConnectorRegistry {
    factories: HashMap<String, Arc<dyn ConnectorFactory>>,
    connectors: Mutex<ConnectorList>,
    next_id: AtomicU64,
    publisher: Arc<EventPublisher>,
}

impl ConnectorRegistry {
    pub fn new(publisher: Arc<EventPublisher>) -> Self {
        Self {
            factories: HashMap::new(),
            connectors: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            publisher,
        }
    }

    /// Register the factory for an exchange id
    pub fn register(&mut self, exchange: impl Into<String>, factory: Arc<dyn ConnectorFactory>) {
        self.factories.insert(exchange.into(), factory);
    }

    pub fn exchanges(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn prune(list: &mut ConnectorList) {
        list.retain(|c| !c.is_closed());
        metrics::set_connectors_active(list.len());
    }

    async fn owner_of(
        list: &ConnectorList,
        exchange: &str,
        symbol: &Symbol,
        kind: ChannelKind,
    ) -> Option<Arc<dyn MarketConnector>> {
        for connector in list.iter().filter(|c| c.exchange() == exchange) {
            let wire = connector.wire_channel(symbol, kind);
            if connector.active_channels().await.contains(&wire) {
                return Some(Arc::clone(connector));
            }
        }
        None
    }

    /// Live connector currently carrying (symbol, kind) on `exchange`
    pub async fn find_connector(
        &self,
        exchange: &str,
        symbol: &Symbol,
        kind: ChannelKind,
    ) -> Option<Arc<dyn MarketConnector>> {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        Self::owner_of(&list, exchange, symbol, kind).await
    }

    /// Open a new connector. Rejected as a whole if any requested pair is
    /// already live on this exchange.
    pub async fn create_connector(
        &self,
        spec: ConnectorSpec,
    ) -> Result<Arc<dyn MarketConnector>, RegistryError> {
        let factory = self
            .factories
            .get(&spec.exchange)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownPlatform(spec.exchange.clone()))?;

        let pairs = channel_pairs(&spec.symbols, &spec.kinds);
        if pairs.is_empty() {
            return Err(ConfigurationError::EmptyChannelSet.into());
        }

        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        for (symbol, kind) in pairs {
            if Self::owner_of(&list, &spec.exchange, &symbol, kind).await.is_some() {
                return Err(RegistryError::DuplicateSubscription {
                    exchange: spec.exchange,
                    symbol,
                    kind,
                });
            }
        }

        // The list stays locked through connect so a racing duplicate
        // cannot slip in; feeds bound their own connect time.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connector = factory
            .create(id, spec, Arc::clone(&self.publisher))
            .await?;
        list.push(Arc::clone(&connector));
        metrics::set_connectors_active(list.len());
        info!(connector = id, exchange = %connector.exchange(), "Connector registered");
        Ok(connector)
    }

    /// Subscribe extra channels on an existing connector.
    /// Returns the newly added channels.
    pub async fn add_channels(
        &self,
        connector_id: u64,
        symbols: &[Symbol],
        kinds: &[ChannelKind],
    ) -> Result<Vec<WireChannel>, RegistryError> {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        let connector = list
            .iter()
            .find(|c| c.id() == connector_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("connector {}", connector_id)))?;

        let pairs = channel_pairs(symbols, kinds);
        for (symbol, kind) in &pairs {
            if let Some(owner) = Self::owner_of(&list, connector.exchange(), symbol, *kind).await {
                if owner.id() != connector_id {
                    return Err(RegistryError::DuplicateSubscription {
                        exchange: connector.exchange().to_string(),
                        symbol: symbol.clone(),
                        kind: *kind,
                    });
                }
            }
        }

        Ok(connector.subscribe(&pairs).await?)
    }

    /// Unsubscribe one pair from whichever connector owns it
    pub async fn remove_channels(
        &self,
        exchange: &str,
        symbol: &Symbol,
        kind: ChannelKind,
    ) -> Result<WireChannel, RegistryError> {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        let owner = Self::owner_of(&list, exchange, symbol, kind)
            .await
            .ok_or_else(|| RegistryError::NotFound(format!("{} {} {}", exchange, symbol, kind)))?;

        let removed = owner.unsubscribe(&[(symbol.clone(), kind)]).await?;
        if owner.is_closed() {
            Self::prune(&mut list);
        }
        removed
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound(format!("{} {} {}", exchange, symbol, kind)))
    }

    /// One `"<exchange>:<c1>/<c2>/..."` entry per live connector
    pub async fn channel_listing(&self) -> Vec<String> {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        let mut out = Vec::with_capacity(list.len());
        for connector in list.iter() {
            let channels: Vec<String> = connector
                .active_channels()
                .await
                .into_iter()
                .map(|w| w.to_string())
                .collect();
            out.push(format!("{}:{}", connector.exchange(), channels.join("/")));
        }
        out
    }

    pub async fn snapshot(&self) -> Vec<ConnectorSummary> {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        let mut out = Vec::with_capacity(list.len());
        for connector in list.iter() {
            out.push(ConnectorSummary {
                id: connector.id(),
                exchange: connector.exchange().to_string(),
                state: connector.state(),
                channels: connector.active_channels().await.into_iter().collect(),
            });
        }
        out
    }

    /// Live connector count
    pub async fn len(&self) -> usize {
        let mut list = self.connectors.lock().await;
        Self::prune(&mut list);
        list.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn close_all(&self) {
        let mut list = self.connectors.lock().await;
        if !list.is_empty() {
            info!(connectors = list.len(), "Closing all connectors");
        }
        for connector in list.drain(..) {
            connector.close().await;
            if !connector.is_closed() {
                warn!(connector = connector.id(), "Connector did not close");
            }
        }
        metrics::set_connectors_active(0);
    }
}
