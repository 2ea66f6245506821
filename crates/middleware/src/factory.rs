use std::sync::Arc;

use mdfeed_metadata::{Environment, TransportType};
use tracing::info;

use crate::error::FactoryError;
use crate::memory::InMemoryTransport;
use crate::nats::NatsTransport;
use crate::transport::Transport;

/// Factory for creating middleware instances based on environment config
pub struct MiddlewareFactory;

impl MiddlewareFactory {
    /// Create the event bus transport described by the environment
    pub async fn create_transport(env: &Environment) -> Result<Arc<dyn Transport>, FactoryError> {
        match env.transport.transport_type {
            TransportType::Memory => {
                info!(env = %env.name, "Using in-memory transport");
                Ok(Arc::new(InMemoryTransport::new()))
            }
            TransportType::Nats => {
                let url = env.transport.url.as_deref().ok_or_else(|| {
                    FactoryError::ConfigError("nats transport requires url".to_string())
                })?;
                info!(env = %env.name, url = %url, "Connecting to NATS transport");
                let transport = NatsTransport::connect(url).await?;
                Ok(Arc::new(transport))
            }
        }
    }
}
