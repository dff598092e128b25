//! Dynamic edge request routing.
//!
//! Routes (host pattern + path prefix → destination) are registered into a
//! capacity-limited key-value store at deploy time; the edge dispatcher
//! reads the store on every request, picks the most specific route and
//! rewrites the request's destination before it is forwarded.

pub mod admin;
pub mod config;
pub mod edge;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod store;

pub use config::schema::ProxyConfig;
pub use edge::{Dispatcher, EdgeOutcome, EdgeRequest};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Registrar;
pub use store::{KvStore, MemoryStore};
