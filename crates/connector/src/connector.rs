//! Generic combined-stream market connector
//!
//! A [`StreamConnector`] owns one feed transport and the set of channels
//! live on it. Exchange specifics live entirely in its [`ChannelCodec`].
//!
//! Inbound frames are handled by a spawned task, one at a time and in
//! arrival order. Channel lookup happens under the connector lock; decoding
//! and publishing happen outside it.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, trace, warn};

use mdfeed_middleware::latency::elapsed_since;

use crate::codec::{ChannelCodec, ControlMethod, DecodeContext, Envelope};
use crate::error::{ConfigurationError, ConnectorError, MessageError, RegistryError};
use crate::events::MarketEvent;
use crate::metrics::ConnectorMetrics;
use crate::publisher::EventPublisher;
use crate::traits::{ConnectorFactory, FeedBuilder, FeedTransport, MarketConnector, TimestampedMsg};
use crate::types::{channel_pairs, ChannelKind, Symbol, WireChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    Connecting,
    Live,
    Draining,
    Closed,
}

impl ConnectorState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectorState::Connecting => 0,
            ConnectorState::Live => 1,
            ConnectorState::Draining => 2,
            ConnectorState::Closed => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectorState::Connecting,
            1 => ConnectorState::Live,
            2 => ConnectorState::Draining,
            _ => ConnectorState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorState::Connecting => "connecting",
            ConnectorState::Live => "live",
            ConnectorState::Draining => "draining",
            ConnectorState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to open: one exchange endpoint carrying symbols × kinds
#[derive(Debug, Clone)]
pub struct ConnectorSpec {
    pub exchange: String,
    /// Overrides the codec's default endpoint
    pub endpoint: Option<String>,
    pub symbols: Vec<Symbol>,
    pub kinds: Vec<ChannelKind>,
    pub orderbook_depth: usize,
}

struct Inner {
    live: BTreeSet<WireChannel>,
    /// Every channel ever subscribed on this connection
    index: HashMap<WireChannel, (Symbol, ChannelKind)>,
    transport: Box<dyn FeedTransport>,
}

pub struct StreamConnector<C: ChannelCodec> {
    id: u64,
    exchange: String,
    orderbook_depth: usize,
    codec: C,
    publisher: Arc<EventPublisher>,
    state: AtomicU8,
    request_id: AtomicU64,
    inner: Mutex<Inner>,
    shutdown: watch::Sender<bool>,
    metrics: ConnectorMetrics,
}

impl<C: ChannelCodec> StreamConnector<C> {
    /// Connect to the combined stream for `spec` and start the message task
    pub async fn open(
        id: u64,
        spec: ConnectorSpec,
        codec: C,
        transport: Box<dyn FeedTransport>,
        publisher: Arc<EventPublisher>,
    ) -> Result<Arc<Self>, RegistryError> {
        let pairs = channel_pairs(&spec.symbols, &spec.kinds);
        if pairs.is_empty() {
            return Err(ConfigurationError::EmptyChannelSet.into());
        }

        let mut live = BTreeSet::new();
        let mut index = HashMap::new();
        let mut channels = Vec::with_capacity(pairs.len());
        for (symbol, kind) in pairs {
            let wire = codec.symbol_to_wire_channel(&symbol, kind);
            if live.insert(wire.clone()) {
                channels.push(wire.clone());
                index.insert(wire, (symbol, kind));
            }
        }

        let endpoint = spec
            .endpoint
            .clone()
            .unwrap_or_else(|| codec.default_endpoint().to_string());
        let url = codec.stream_url(&endpoint, &channels);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let metrics = ConnectorMetrics::new(spec.exchange.clone(), id);

        let connector = Arc::new(Self {
            id,
            exchange: spec.exchange,
            orderbook_depth: spec.orderbook_depth,
            codec,
            publisher,
            state: AtomicU8::new(ConnectorState::Connecting.as_u8()),
            request_id: AtomicU64::new(1),
            inner: Mutex::new(Inner {
                live,
                index,
                transport,
            }),
            shutdown,
            metrics,
        });

        let rx = {
            let mut inner = connector.inner.lock().await;
            let rx = inner.transport.connect(&url).await.map_err(|e| {
                connector.set_state(ConnectorState::Closed);
                e
            })?;
            connector.set_state(ConnectorState::Live);
            connector.metrics.set_active_channels(inner.live.len());
            rx
        };

        info!(
            connector = id,
            exchange = %connector.exchange,
            channels = channels.len(),
            %endpoint,
            "Connector live"
        );

        tokio::spawn(Arc::clone(&connector).run(rx, shutdown_rx));
        Ok(connector)
    }

    fn set_state(&self, state: ConnectorState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Message task: one frame at a time until closed or disconnected
    async fn run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<TimestampedMsg>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                msg = rx.recv() => {
                    let Some((ws_tsc, data)) = msg else {
                        self.on_disconnect().await;
                        break;
                    };
                    match self.on_message(&data).await {
                        Ok(Some(event)) => {
                            trace!(
                                connector = self.id,
                                kind = %event.kind(),
                                symbol = event.symbol(),
                                latency_us = elapsed_since(ws_tsc).as_micros() as u64,
                                "Published event"
                            );
                        }
                        Ok(None) => {}
                        Err(MessageError::Closed) => break,
                        Err(_) => {}
                    }
                }
            }
        }
        debug!(connector = self.id, "Message task exited");
    }

    async fn on_disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if self.state() == ConnectorState::Closed {
            return;
        }
        if let Err(e) = inner.transport.close().await {
            debug!(connector = self.id, error = %e, "Error closing disconnected feed");
        }
        self.set_state(ConnectorState::Closed);
        self.metrics.clear_active_channels();
        warn!(
            connector = self.id,
            exchange = %self.exchange,
            "Feed disconnected unexpectedly, connector closed"
        );
    }

    /// Handle one raw inbound frame.
    ///
    /// Returns the published event, `Ok(None)` for control frames, or the
    /// reason the frame was dropped. Every failure is logged here.
    pub async fn on_message(&self, raw: &[u8]) -> Result<Option<MarketEvent>, MessageError> {
        let received_at = chrono::Utc::now().timestamp_millis();

        let (stream, data) = match self.codec.parse_envelope(raw) {
            Ok(Envelope::Stream { stream, data }) => (stream, data),
            Ok(Envelope::Control(ack)) => {
                debug!(connector = self.id, %ack, "Control frame");
                return Ok(None);
            }
            Err(e) => {
                self.metrics.inc_decode_error();
                warn!(connector = self.id, error = %e, "Malformed frame");
                return Err(e.into());
            }
        };

        let symbol = {
            let inner = self.inner.lock().await;
            if self.state() == ConnectorState::Closed {
                return Err(MessageError::Closed);
            }
            let Some((symbol, _)) = inner.index.get(&stream) else {
                self.metrics.inc_unrecognized();
                warn!(connector = self.id, %stream, "Unrecognized stream");
                return Err(MessageError::UnrecognizedChannel(stream));
            };
            if !inner.live.contains(&stream) {
                debug!(connector = self.id, %stream, "Dropping frame for unsubscribed stream");
                return Err(MessageError::InactiveChannel(stream));
            }
            symbol.clone()
        };

        let Some(kind) = self.codec.event_kind(&data) else {
            let tag = data.get("e").and_then(|e| e.as_str()).map(str::to_string);
            warn!(connector = self.id, %stream, ?tag, "Unsupported event");
            return Err(MessageError::UnsupportedEvent { stream, tag });
        };

        let ctx = DecodeContext {
            exchange: &self.exchange,
            symbol: &symbol,
            orderbook_depth: self.orderbook_depth,
            received_at,
        };
        let event = self.codec.decode(kind, data, &ctx).map_err(|e| {
            self.metrics.inc_decode_error();
            warn!(connector = self.id, %stream, error = %e, "Failed to decode payload");
            e
        })?;

        if let Err(e) = self.publisher.publish(&event).await {
            warn!(connector = self.id, %stream, error = %e, "Failed to publish event");
            return Err(e.into());
        }
        self.metrics.inc_message(kind.as_str());
        Ok(Some(event))
    }

    /// Close the transport and finish the lifecycle. Caller holds the lock.
    async fn shut_down(&self, inner: &mut Inner) {
        self.set_state(ConnectorState::Draining);
        if let Err(e) = inner.transport.close().await {
            warn!(connector = self.id, error = %e, "Error closing feed");
        }
        self.set_state(ConnectorState::Closed);
        let _ = self.shutdown.send(true);
        self.metrics.clear_active_channels();
        info!(connector = self.id, exchange = %self.exchange, "Connector closed");
    }
}

#[async_trait]
impl<C: ChannelCodec> MarketConnector for StreamConnector<C> {
    fn id(&self) -> u64 {
        self.id
    }

    fn exchange(&self) -> &str {
        &self.exchange
    }

    fn wire_channel(&self, symbol: &Symbol, kind: ChannelKind) -> WireChannel {
        self.codec.symbol_to_wire_channel(symbol, kind)
    }

    fn state(&self) -> ConnectorState {
        ConnectorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    async fn active_channels(&self) -> BTreeSet<WireChannel> {
        self.inner.lock().await.live.clone()
    }

    async fn subscribe(
        &self,
        pairs: &[(Symbol, ChannelKind)],
    ) -> Result<Vec<WireChannel>, ConnectorError> {
        let mut inner = self.inner.lock().await;
        if self.state() != ConnectorState::Live {
            return Err(ConnectorError::Closed);
        }

        let mut added = Vec::new();
        let mut first_seen = Vec::new();
        for (symbol, kind) in pairs {
            let wire = self.codec.symbol_to_wire_channel(symbol, *kind);
            if inner.live.insert(wire.clone()) {
                if inner
                    .index
                    .insert(wire.clone(), (symbol.clone(), *kind))
                    .is_none()
                {
                    first_seen.push(wire.clone());
                }
                added.push(wire);
            }
        }
        if added.is_empty() {
            return Ok(added);
        }

        let frame = self
            .codec
            .control_message(ControlMethod::Subscribe, &added, self.next_request_id());
        if let Err(e) = inner.transport.send(frame).await {
            for wire in &added {
                inner.live.remove(wire);
            }
            // Never subscribed, so never indexed
            for wire in &first_seen {
                inner.index.remove(wire);
            }
            warn!(connector = self.id, error = %e, "SUBSCRIBE failed, rolled back");
            return Err(e);
        }

        self.metrics.set_active_channels(inner.live.len());
        info!(connector = self.id, channels = ?added, "Subscribed");
        Ok(added)
    }

    async fn unsubscribe(
        &self,
        pairs: &[(Symbol, ChannelKind)],
    ) -> Result<Vec<WireChannel>, ConnectorError> {
        let mut inner = self.inner.lock().await;
        if self.state() != ConnectorState::Live {
            return Err(ConnectorError::Closed);
        }

        let mut removed = Vec::new();
        for (symbol, kind) in pairs {
            let wire = self.codec.symbol_to_wire_channel(symbol, *kind);
            if inner.live.remove(&wire) {
                removed.push(wire);
            }
        }
        if removed.is_empty() {
            return Ok(removed);
        }

        let frame =
            self.codec
                .control_message(ControlMethod::Unsubscribe, &removed, self.next_request_id());
        if let Err(e) = inner.transport.send(frame).await {
            warn!(connector = self.id, error = %e, "UNSUBSCRIBE send failed");
        }
        info!(connector = self.id, channels = ?removed, "Unsubscribed");

        if inner.live.is_empty() {
            self.shut_down(&mut inner).await;
        } else {
            self.metrics.set_active_channels(inner.live.len());
        }
        Ok(removed)
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if self.state() == ConnectorState::Closed {
            return;
        }
        inner.live.clear();
        self.shut_down(&mut inner).await;
    }
}

/// [`ConnectorFactory`] for any combined-stream exchange
pub struct StreamConnectorFactory<C> {
    codec: C,
    feed: FeedBuilder,
}

impl<C: ChannelCodec + Clone> StreamConnectorFactory<C> {
    pub fn new(codec: C, feed: FeedBuilder) -> Self {
        Self { codec, feed }
    }
}

#[async_trait]
impl<C: ChannelCodec + Clone> ConnectorFactory for StreamConnectorFactory<C> {
    async fn create(
        &self,
        id: u64,
        spec: ConnectorSpec,
        publisher: Arc<EventPublisher>,
    ) -> Result<Arc<dyn MarketConnector>, RegistryError> {
        let transport = (self.feed)();
        let connector = StreamConnector::open(id, spec, self.codec.clone(), transport, publisher).await?;
        Ok(connector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance_futures::BinanceFuturesCodec;
    use crate::events::TradeSide;
    use crate::memory_feed::{FeedEvent, FeedProbe, InMemoryFeed};
    use mdfeed_middleware::{InMemoryTransport, Transport};
    use std::time::Duration;

    const TRADE_FRAME: &str = r#"{"stream":"btcusdt@aggTrade","data":{"e":"aggTrade","E":1690000000005,"s":"BTCUSDT","a":1,"p":"100.5","q":"0.01","f":1,"l":1,"T":1690000000000,"m":true}}"#;

    fn spec(symbols: &[&str], kinds: &[ChannelKind]) -> ConnectorSpec {
        ConnectorSpec {
            exchange: "binance_future".to_string(),
            endpoint: Some("wss://test.local".to_string()),
            symbols: symbols.iter().map(|s| Symbol::new(s)).collect(),
            kinds: kinds.to_vec(),
            orderbook_depth: 20,
        }
    }

    async fn open(
        spec: ConnectorSpec,
    ) -> (
        Arc<StreamConnector<BinanceFuturesCodec>>,
        FeedProbe,
        Arc<InMemoryTransport>,
    ) {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Arc::new(EventPublisher::new(transport.clone(), "test"));
        let (feed, probe) = InMemoryFeed::new();
        let connector = StreamConnector::open(1, spec, BinanceFuturesCodec, Box::new(feed), publisher)
            .await
            .unwrap();
        (connector, probe, transport)
    }

    fn btc(kind: ChannelKind) -> (Symbol, ChannelKind) {
        (Symbol::new("BTCUSDT"), kind)
    }

    #[tokio::test]
    async fn test_open_builds_combined_stream_url() {
        let (connector, probe, _) =
            open(spec(&["BTCUSDT", "eth/usdt"], &[ChannelKind::Trade, ChannelKind::Kline])).await;

        assert_eq!(connector.state(), ConnectorState::Live);
        assert_eq!(
            probe.url().as_deref(),
            Some("wss://test.local/stream?streams=btcusdt@aggTrade/btcusdt@kline_1m/ethusdt@aggTrade/ethusdt@kline_1m")
        );
        assert_eq!(connector.active_channels().await.len(), 4);
    }

    #[tokio::test]
    async fn test_open_with_no_pairs_fails() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Arc::new(EventPublisher::new(transport, "test"));
        let (feed, probe) = InMemoryFeed::new();
        let result = StreamConnector::open(
            1,
            spec(&["BTCUSDT"], &[]),
            BinanceFuturesCodec,
            Box::new(feed),
            publisher,
        )
        .await;

        assert!(matches!(
            result,
            Err(RegistryError::Configuration(ConfigurationError::EmptyChannelSet))
        ));
        assert!(probe.url().is_none());
    }

    #[tokio::test]
    async fn test_open_connect_failure() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Arc::new(EventPublisher::new(transport, "test"));
        let (feed, probe) = InMemoryFeed::new();
        probe.fail_connect(true);
        let result = StreamConnector::open(
            1,
            spec(&["BTCUSDT"], &[ChannelKind::Trade]),
            BinanceFuturesCodec,
            Box::new(feed),
            publisher,
        )
        .await;

        assert!(matches!(result, Err(RegistryError::Connector(_))));
    }

    #[tokio::test]
    async fn test_trade_frame_publishes_event() {
        let (connector, _probe, transport) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let mut sub = transport
            .subscribe("test.binance_future.trade.BTCUSDT")
            .await
            .unwrap();

        let event = connector.on_message(TRADE_FRAME.as_bytes()).await.unwrap().unwrap();
        match &event {
            MarketEvent::Trade(trade) => {
                assert_eq!(trade.symbol, "BTCUSDT");
                assert_eq!(trade.side, TradeSide::Sell);
                assert_eq!(trade.price, 100.5);
                assert_eq!(trade.quantity, 0.01);
                assert_eq!(trade.timestamp, 1690000000000);
                assert!(trade.received_at > 0);
            }
            other => panic!("expected trade, got {:?}", other),
        }

        let msg = sub.next().await.unwrap();
        let published: MarketEvent = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(published, event);
    }

    #[tokio::test]
    async fn test_unrecognized_stream_dropped() {
        let (connector, _probe, transport) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let frame = TRADE_FRAME.replace("btcusdt@aggTrade", "xrpusdt@aggTrade");

        let err = connector.on_message(frame.as_bytes()).await.unwrap_err();
        assert!(matches!(err, MessageError::UnrecognizedChannel(ref w) if w.as_str() == "xrpusdt@aggTrade"));
        assert_eq!(transport.published(), 0);
    }

    #[tokio::test]
    async fn test_control_ack_yields_nothing() {
        let (connector, _probe, transport) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let result = connector.on_message(br#"{"result":null,"id":1}"#).await.unwrap();
        assert!(result.is_none());
        assert_eq!(transport.published(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_decode_error() {
        let (connector, _probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let err = connector.on_message(b"{not json").await.unwrap_err();
        assert!(matches!(err, MessageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unsupported_event_tag() {
        let (connector, _probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let frame = r#"{"stream":"btcusdt@aggTrade","data":{"e":"markPriceUpdate"}}"#;
        let err = connector.on_message(frame.as_bytes()).await.unwrap_err();
        assert!(matches!(
            err,
            MessageError::UnsupportedEvent { tag: Some(ref t), .. } if t == "markPriceUpdate"
        ));
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let (connector, probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;

        let added = connector
            .subscribe(&[btc(ChannelKind::Trade), btc(ChannelKind::Kline)])
            .await
            .unwrap();
        assert_eq!(added, vec![WireChannel::new("btcusdt@kline_1m")]);

        let again = connector
            .subscribe(&[btc(ChannelKind::Trade), btc(ChannelKind::Kline)])
            .await
            .unwrap();
        assert!(again.is_empty());

        let frames = probe.sent_frames();
        assert_eq!(frames.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(json["method"], "SUBSCRIBE");
        assert_eq!(json["params"], serde_json::json!(["btcusdt@kline_1m"]));
        assert_eq!(json["id"], 1);
    }

    #[tokio::test]
    async fn test_subscribe_send_failure_rolls_back() {
        let (connector, probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        probe.fail_sends(true);

        let result = connector.subscribe(&[btc(ChannelKind::Kline)]).await;
        assert!(matches!(result, Err(ConnectorError::SendFailed(_))));
        assert_eq!(
            connector.active_channels().await,
            BTreeSet::from([WireChannel::new("btcusdt@aggTrade")])
        );

        // The failed stream was never live, so its frames are unknown to us
        let frame = r#"{"stream":"btcusdt@kline_1m","data":{"e":"kline"}}"#;
        let err = connector.on_message(frame.as_bytes()).await.unwrap_err();
        assert!(matches!(err, MessageError::UnrecognizedChannel(ref w) if w.as_str() == "btcusdt@kline_1m"));
    }

    #[tokio::test]
    async fn test_failed_resubscribe_keeps_earlier_index_entry() {
        let (connector, probe, _) =
            open(spec(&["BTCUSDT"], &[ChannelKind::Trade, ChannelKind::Kline])).await;
        connector.unsubscribe(&[btc(ChannelKind::Trade)]).await.unwrap();
        probe.fail_sends(true);

        assert!(connector.subscribe(&[btc(ChannelKind::Trade)]).await.is_err());
        let err = connector.on_message(TRADE_FRAME.as_bytes()).await.unwrap_err();
        assert!(matches!(err, MessageError::InactiveChannel(_)));
    }

    #[tokio::test]
    async fn test_unsubscribe_partial_keeps_connection() {
        let (connector, probe, _) =
            open(spec(&["BTCUSDT"], &[ChannelKind::Trade, ChannelKind::Kline])).await;

        let removed = connector
            .unsubscribe(&[btc(ChannelKind::Kline), btc(ChannelKind::Orderbook)])
            .await
            .unwrap();
        assert_eq!(removed, vec![WireChannel::new("btcusdt@kline_1m")]);
        assert_eq!(connector.state(), ConnectorState::Live);
        assert_eq!(probe.close_count(), 0);

        let json: serde_json::Value = serde_json::from_str(&probe.sent_frames()[0]).unwrap();
        assert_eq!(json["method"], "UNSUBSCRIBE");
        assert_eq!(json["params"], serde_json::json!(["btcusdt@kline_1m"]));
    }

    #[tokio::test]
    async fn test_removing_last_channel_closes_after_unsubscribe() {
        let (connector, probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;

        let removed = connector.unsubscribe(&[btc(ChannelKind::Trade)]).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(connector.state(), ConnectorState::Closed);
        assert!(connector.is_closed());
        assert_eq!(probe.close_count(), 1);

        let events = probe.events();
        assert!(matches!(events.as_slice(), [FeedEvent::Connected(_), FeedEvent::Sent(_), FeedEvent::Closed]));

        // Already closed: neither close nor unsubscribe touches the feed again
        connector.close().await;
        assert!(connector.unsubscribe(&[btc(ChannelKind::Trade)]).await.is_err());
        assert_eq!(probe.close_count(), 1);
    }

    #[tokio::test]
    async fn test_no_dispatch_after_close() {
        let (connector, probe, transport) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        connector.close().await;
        connector.close().await;
        assert_eq!(probe.close_count(), 1);

        let err = connector.on_message(TRADE_FRAME.as_bytes()).await.unwrap_err();
        assert!(matches!(err, MessageError::Closed));
        assert_eq!(transport.published(), 0);
    }

    #[tokio::test]
    async fn test_inactive_stream_dropped_after_unsubscribe() {
        let (connector, _probe, transport) =
            open(spec(&["BTCUSDT"], &[ChannelKind::Trade, ChannelKind::Kline])).await;
        connector.unsubscribe(&[btc(ChannelKind::Trade)]).await.unwrap();

        let err = connector.on_message(TRADE_FRAME.as_bytes()).await.unwrap_err();
        assert!(matches!(err, MessageError::InactiveChannel(_)));
        assert_eq!(transport.published(), 0);
    }

    #[tokio::test]
    async fn test_message_task_publishes_pushed_frames() {
        let (_connector, probe, transport) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        let mut sub = transport
            .subscribe("test.binance_future.trade.BTCUSDT")
            .await
            .unwrap();

        assert!(probe.push(TRADE_FRAME).await);
        let msg = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.subject, "test.binance_future.trade.BTCUSDT");
    }

    #[tokio::test]
    async fn test_unexpected_disconnect_marks_closed() {
        let (connector, probe, _) = open(spec(&["BTCUSDT"], &[ChannelKind::Trade])).await;
        probe.disconnect();

        for _ in 0..50 {
            if connector.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(connector.is_closed());
        assert_eq!(probe.close_count(), 1);
        assert!(connector.subscribe(&[btc(ChannelKind::Kline)]).await.is_err());
    }
}
