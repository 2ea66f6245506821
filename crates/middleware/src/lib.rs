//! mdfeed-middleware: Event bus abstractions
//!
//! Provides the [`Transport`] trait the gateway publishes canonical events
//! through, with an in-memory implementation for tests and a NATS one for
//! deployments.

pub mod error;
pub mod factory;
pub mod latency;
pub mod memory;
pub mod nats;
pub mod transport;

pub use error::{FactoryError, TransportError};
pub use factory::MiddlewareFactory;
pub use latency::{now_tsc, CLOCK};
pub use memory::InMemoryTransport;
pub use nats::{sanitize_subject_token, NatsTransport, SubjectBuilder};
pub use transport::{Subscription, Transport, TransportMessage};
