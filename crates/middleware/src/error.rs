use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
}

/// Error creating middleware
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
