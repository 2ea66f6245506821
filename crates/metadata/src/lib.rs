//! mdfeed-metadata: Configuration types for the market feed gateway

pub mod environment;
pub mod error;
pub mod market;

pub use environment::{Environment, ManageConfig, TransportConfig, TransportType};
pub use error::MetadataError;
pub use market::{MarketConfig, DEFAULT_ORDERBOOK_LENGTH};
