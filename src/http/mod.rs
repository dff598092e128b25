//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → edge dispatcher (route selection, origin)
//!     → forward.rs (upstream call, retries, error mapping)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
