//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Seed routes → Start listeners
//!
//! Reload (startup.rs):
//!     Config change → Re-apply declared routes → Swap edge settings
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Broadcast → Servers drain → Store snapshot saved
//! ```
//!
//! # Design Decisions
//! - Declared routes with configuration errors are fatal at startup
//!   but only logged on reload

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
