//! End-to-end connector lifecycle: feed frames in, canonical events out

use std::sync::Arc;
use std::time::Duration;

use mdfeed_connector_lib::{
    binance_futures, ChannelKind, ConnectorRegistry, ConnectorSpec, ConnectorState, EventPublisher,
    FeedEvent, FeedProbes, InMemoryFeed, MarketConnector, MarketEvent, RegistryError, Symbol,
    TradeSide,
};
use mdfeed_middleware::{InMemoryTransport, Subscription, Transport};

const BTC_TRADE: &str = r#"{"stream":"btcusdt@aggTrade","data":{"e":"aggTrade","E":1690000000005,"s":"BTCUSDT","a":7,"p":"100.5","q":"0.01","f":1,"l":1,"T":1690000000000,"m":true}}"#;

const ETH_DEPTH: &str = r#"{"stream":"ethusdt@depth20@100ms","data":{"e":"depthUpdate","E":1690000000200,"T":1690000000190,"s":"ETHUSDT","U":1,"u":2,"pu":0,"b":[["1850.10","2"],["1850.00","1"],["1849.90","4"]],"a":[["1850.20","3"],["1850.30","5"],["1850.40","1"]]}}"#;

fn setup() -> (ConnectorRegistry, FeedProbes, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let publisher = Arc::new(EventPublisher::new(transport.clone(), "md-test"));
    let mut registry = ConnectorRegistry::new(publisher);
    let (feed, probes) = InMemoryFeed::builder();
    binance_futures::register(&mut registry, feed);
    (registry, probes, transport)
}

fn spec(symbols: &[&str], kinds: &[ChannelKind], depth: usize) -> ConnectorSpec {
    ConnectorSpec {
        exchange: binance_futures::EXCHANGE_ID.to_string(),
        endpoint: None,
        symbols: symbols.iter().map(|s| Symbol::new(s)).collect(),
        kinds: kinds.to_vec(),
        orderbook_depth: depth,
    }
}

#[tokio::test]
async fn test_trade_frame_is_published_as_canonical_event() {
    let (registry, probes, transport) = setup();
    let mut sub = transport
        .subscribe("md-test.binance_future.trade.BTCUSDT")
        .await
        .unwrap();
    registry
        .create_connector(spec(&["BTCUSDT"], &[ChannelKind::Trade], 20))
        .await
        .unwrap();

    let probe = probes.get(0).unwrap();
    assert_eq!(
        probe.url().as_deref(),
        Some("wss://fstream.binance.com:443/stream?streams=btcusdt@aggTrade")
    );
    assert!(probe.push(BTC_TRADE).await);

    let msg = tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap();
    match serde_json::from_slice::<MarketEvent>(&msg.payload).unwrap() {
        MarketEvent::Trade(trade) => {
            assert_eq!(trade.exchange, "binance_future");
            assert_eq!(trade.symbol, "BTCUSDT");
            assert_eq!(trade.side, TradeSide::Sell);
            assert_eq!(trade.price, 100.5);
            assert_eq!(trade.quantity, 0.01);
            assert_eq!(trade.timestamp, 1690000000000);
        }
        other => panic!("expected trade, got {:?}", other),
    }
}

#[tokio::test]
async fn test_orderbook_levels_are_truncated_to_depth() {
    let (registry, probes, transport) = setup();
    let mut sub = transport
        .subscribe("md-test.binance_future.orderbook.ETHUSDT")
        .await
        .unwrap();
    registry
        .create_connector(spec(&["ETHUSDT"], &[ChannelKind::Orderbook], 2))
        .await
        .unwrap();

    assert!(probes.get(0).unwrap().push(ETH_DEPTH).await);

    let msg = tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap();
    match serde_json::from_slice::<MarketEvent>(&msg.payload).unwrap() {
        MarketEvent::Orderbook(book) => {
            assert_eq!(book.bids, vec![(1850.10, 2.0), (1850.00, 1.0)]);
            assert_eq!(book.asks, vec![(1850.20, 3.0), (1850.30, 5.0)]);
            assert_eq!(book.timestamp, book.received_at);
        }
        other => panic!("expected orderbook, got {:?}", other),
    }
}

#[tokio::test]
async fn test_frames_keep_arrival_order() {
    let (registry, probes, transport) = setup();
    let mut sub = transport
        .subscribe("md-test.binance_future.trade.BTCUSDT")
        .await
        .unwrap();
    registry
        .create_connector(spec(&["BTCUSDT"], &[ChannelKind::Trade], 20))
        .await
        .unwrap();
    let probe = probes.get(0).unwrap();

    for price in ["1", "2", "3", "4", "5"] {
        let frame = BTC_TRADE.replace("\"p\":\"100.5\"", &format!("\"p\":\"{}\"", price));
        assert!(probe.push(frame).await);
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        let msg = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        if let MarketEvent::Trade(trade) = serde_json::from_slice(&msg.payload).unwrap() {
            seen.push(trade.price);
        }
    }
    assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn test_connection_closes_once_and_stops_dispatch() {
    let (registry, probes, transport) = setup();
    let connector = registry
        .create_connector(spec(&["BTCUSDT"], &[ChannelKind::Trade, ChannelKind::Kline], 20))
        .await
        .unwrap();
    let probe = probes.get(0).unwrap();

    registry
        .remove_channels("binance_future", &Symbol::new("BTCUSDT"), ChannelKind::Kline)
        .await
        .unwrap();
    assert_eq!(connector.state(), ConnectorState::Live);

    registry
        .remove_channels("binance_future", &Symbol::new("BTCUSDT"), ChannelKind::Trade)
        .await
        .unwrap();
    assert_eq!(connector.state(), ConnectorState::Closed);

    // Frames after close go nowhere
    assert!(!probe.push(BTC_TRADE).await);
    registry.close_all().await;
    connector.close().await;

    assert_eq!(probe.close_count(), 1);
    assert!(matches!(
        probe.events().last(),
        Some(FeedEvent::Closed)
    ));
    assert_eq!(transport.published(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_unsubscribe_on_one_connector() {
    const TASKS: usize = 16;
    let (registry, probes, _transport) = setup();
    let connector = registry
        .create_connector(spec(&["BTCUSDT"], &[ChannelKind::Trade], 20))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..TASKS {
        let connector = Arc::clone(&connector);
        handles.push(tokio::spawn(async move {
            let pair = [(Symbol::new(&format!("SYM{}USDT", i)), ChannelKind::Kline)];
            let added = connector.subscribe(&pair).await.unwrap();
            assert_eq!(added.len(), 1);
            let removed = connector.unsubscribe(&pair).await.unwrap();
            assert_eq!(removed, added);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let live: Vec<String> = connector
        .active_channels()
        .await
        .iter()
        .map(|w| w.as_str().to_string())
        .collect();
    assert_eq!(live, vec!["btcusdt@aggTrade".to_string()]);
    assert_eq!(connector.state(), ConnectorState::Live);

    let probe = probes.get(0).unwrap();
    let frames = probe.sent_frames();
    assert_eq!(frames.len(), 2 * TASKS);
    assert_eq!(probe.close_count(), 0);

    // Every stream is subscribed before it is unsubscribed
    for i in 0..TASKS {
        let stream = format!("sym{}usdt@kline_1m", i);
        let position = |method: &str| {
            frames.iter().position(|f| {
                let json: serde_json::Value = serde_json::from_str(f).unwrap();
                json["method"] == method && json["params"] == serde_json::json!([stream])
            })
        };
        let sub = position("SUBSCRIBE").unwrap();
        let unsub = position("UNSUBSCRIBE").unwrap();
        assert!(sub < unsub, "{} unsubscribed before subscribe", stream);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicate_creates_admit_one() {
    let (registry, probes, _transport) = setup();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .create_connector(spec(&["BTCUSDT"], &[ChannelKind::Trade], 20))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(RegistryError::DuplicateSubscription { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!((created, rejected), (1, 1));
    assert_eq!(registry.len().await, 1);
    assert_eq!(probes.len(), 1);
}
