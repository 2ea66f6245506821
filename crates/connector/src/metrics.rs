//! Prometheus metrics for the connector
//!
//! Per-exchange counters for inbound message handling plus per-connector
//! channel gauges.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};
use std::time::Duration;

const LABEL_EXCHANGE: &str = "exchange";
const LABEL_KIND: &str = "kind";
const LABEL_CONNECTOR: &str = "connector";

/// Events decoded and published per exchange and kind
static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mdfeed_connector_messages_total",
        "Market events decoded and published",
        &[LABEL_EXCHANGE, LABEL_KIND]
    )
    .expect("Failed to register messages_total metric")
});

/// Frames on a stream no connector ever subscribed to
static UNRECOGNIZED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mdfeed_connector_unrecognized_total",
        "Frames received for an unrecognized channel",
        &[LABEL_EXCHANGE]
    )
    .expect("Failed to register unrecognized_total metric")
});

static DECODE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mdfeed_connector_decode_errors_total",
        "Frames that failed to decode",
        &[LABEL_EXCHANGE]
    )
    .expect("Failed to register decode_errors_total metric")
});

/// Live channels per connector
static ACTIVE_CHANNELS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "mdfeed_connector_active_channels",
        "Live channels per connector",
        &[LABEL_EXCHANGE, LABEL_CONNECTOR]
    )
    .expect("Failed to register active_channels metric")
});

static CONNECTORS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mdfeed_connectors_active",
        "Connectors currently registered and not closed"
    )
    .expect("Failed to register connectors_active metric")
});

static PUBLISH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "mdfeed_connector_publish_duration_seconds",
        "Time spent publishing one event to the transport",
        &[LABEL_EXCHANGE],
        vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]
    )
    .expect("Failed to register publish_duration metric")
});

/// Handle for recording metrics for one connector
#[derive(Clone)]
pub struct ConnectorMetrics {
    exchange: String,
    connector: String,
}

impl ConnectorMetrics {
    pub fn new(exchange: impl Into<String>, connector_id: u64) -> Self {
        Self {
            exchange: exchange.into(),
            connector: connector_id.to_string(),
        }
    }

    pub fn inc_message(&self, kind: &str) {
        MESSAGES_TOTAL
            .with_label_values(&[&self.exchange, kind])
            .inc();
    }

    pub fn inc_unrecognized(&self) {
        UNRECOGNIZED_TOTAL.with_label_values(&[&self.exchange]).inc();
    }

    pub fn inc_decode_error(&self) {
        DECODE_ERRORS_TOTAL.with_label_values(&[&self.exchange]).inc();
    }

    pub fn set_active_channels(&self, count: usize) {
        ACTIVE_CHANNELS
            .with_label_values(&[&self.exchange, &self.connector])
            .set(count as i64);
    }

    /// Drop the per-connector gauge once the connection is gone
    pub fn clear_active_channels(&self) {
        let _ = ACTIVE_CHANNELS.remove_label_values(&[&self.exchange, &self.connector]);
    }
}

pub fn set_connectors_active(count: usize) {
    CONNECTORS_ACTIVE.set(count as i64);
}

pub fn observe_publish(exchange: &str, elapsed: Duration) {
    PUBLISH_DURATION
        .with_label_values(&[exchange])
        .observe(elapsed.as_secs_f64());
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics are not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_metrics_recorded() {
        let metrics = ConnectorMetrics::new("metrics_test", 1);
        metrics.inc_message("trade");
        metrics.inc_unrecognized();
        metrics.set_active_channels(3);

        let output = encode_metrics().unwrap();
        assert!(output.contains("mdfeed_connector_messages_total"));
        assert!(output.contains("mdfeed_connector_active_channels"));

        metrics.clear_active_channels();
    }

    #[test]
    fn test_observe_publish() {
        observe_publish("metrics_test", Duration::from_micros(20));
        let output = encode_metrics().unwrap();
        assert!(output.contains("mdfeed_connector_publish_duration_seconds"));
    }
}
