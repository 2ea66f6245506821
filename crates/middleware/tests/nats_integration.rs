//! Integration tests for NATS transport
//!
//! Run with: cargo test -p mdfeed-middleware --test nats_integration -- --ignored
//! Requires: docker run -p 4222:4222 nats:latest

use bytes::Bytes;
use mdfeed_middleware::{NatsTransport, SubjectBuilder, Transport};

#[tokio::test]
#[ignore]
async fn test_nats_publish_subscribe_roundtrip() {
    let transport = NatsTransport::connect("nats://localhost:4222")
        .await
        .expect("Failed to connect to NATS");

    let subjects = SubjectBuilder::new("md-test");
    let subject = subjects.event("binance_future", "trade", "BTCUSDT");

    let mut sub = transport
        .subscribe(&subject)
        .await
        .expect("Failed to subscribe");

    transport
        .publish(&subject, Bytes::from(r#"{"type":"trade"}"#))
        .await
        .expect("Failed to publish");

    let msg = sub.next().await.expect("Failed to receive");
    assert_eq!(msg.subject, "md-test.binance_future.trade.BTCUSDT");
    assert_eq!(msg.payload, Bytes::from(r#"{"type":"trade"}"#));
}

#[tokio::test]
#[ignore]
async fn test_nats_wildcard_receives_every_event() {
    let transport = NatsTransport::connect("nats://localhost:4222")
        .await
        .expect("Failed to connect to NATS");

    let subjects = SubjectBuilder::new("md-test-wild");
    let mut sub = transport
        .subscribe(subjects.all())
        .await
        .expect("Failed to subscribe");

    for kind in ["kline", "orderbook", "trade"] {
        transport
            .publish(&subjects.event("binance_future", kind, "ETHUSDT"), Bytes::from("{}"))
            .await
            .expect("Failed to publish");
    }

    for kind in ["kline", "orderbook", "trade"] {
        let msg = sub.next().await.expect("Failed to receive");
        assert_eq!(msg.subject, format!("md-test-wild.binance_future.{}.ETHUSDT", kind));
    }
}
