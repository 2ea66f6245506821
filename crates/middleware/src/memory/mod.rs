mod transport;

pub use transport::InMemoryTransport;
