//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to origin:
//!     → connect failure → backoff.rs (delay before the next attempt)
//!     → attempts exhausted → 502 to the client
//! ```
//!
//! # Design Decisions
//! - Only connection failures are retried; a request that reached the
//!   origin is never sent twice
//! - Attempt count comes from route metadata, falling back to config

pub mod backoff;
