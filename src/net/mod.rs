//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Edge listener
//!     → plain TCP (tokio TcpListener, axum::serve)
//!     → or TLS (tls.rs, axum-server rustls acceptor)
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

pub use tls::load_tls_config;
