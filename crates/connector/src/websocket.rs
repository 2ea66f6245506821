use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};
use url::Url;

use crate::error::ConnectorError;
use crate::traits::{FeedBuilder, FeedTransport, TimestampedMsg};
use mdfeed_middleware::now_tsc;

const INBOUND_BUFFER: usize = 4096;

/// Upper bound on TCP connect plus WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// Exchange WebSocket feed over tokio-tungstenite
pub struct WebSocketFeed {
    sink: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    connect_timeout: Duration,
}

impl Default for WebSocketFeed {
    fn default() -> Self {
        Self {
            sink: None,
            reader: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl WebSocketFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder producing a fresh WebSocket feed per connector
    pub fn builder() -> FeedBuilder {
        Arc::new(|| Box::new(WebSocketFeed::new()) as Box<dyn FeedTransport>)
    }
}

#[async_trait]
impl FeedTransport for WebSocketFeed {
    async fn connect(&mut self, url: &str) -> Result<mpsc::Receiver<TimestampedMsg>, ConnectorError> {
        let url = Url::parse(url).map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ConnectorError::ConnectTimeout(self.connect_timeout))?
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        let (write, mut read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        // Reader task: ends (dropping tx) on close frame or socket error
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if tx.send((now_tsc(), text.into_bytes())).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Binary(data)) => {
                        if tx.send((now_tsc(), data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                    _ => {}
                }
            }
        });

        self.sink = Some(write);
        self.reader = Some(reader);
        Ok(rx)
    }

    async fn send(&mut self, text: String) -> Result<(), ConnectorError> {
        let sink = self.sink.as_mut().ok_or(ConnectorError::Closed)?;
        sink.send(WsMessage::Text(text))
            .await
            .map_err(|e| ConnectorError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        sink.send(WsMessage::Close(None))
            .await
            .map_err(|e| ConnectorError::Disconnected(e.to_string()))
    }
}
