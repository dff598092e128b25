//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Deploy-time:
//!     RouteDeclaration (pattern + destination)
//!     → pattern.rs (host regex + path prefix)
//!     → registrar.rs (metadata first, then table upsert)
//!     → store
//!
//! Request-time:
//!     table.rs (load, chunks resolved)
//!     → matcher.rs (longest host, then longest path)
//!     → metadata.rs (decode by entry kind)
//! ```
//!
//! # Design Decisions
//! - Matching is a pure function over the loaded table
//! - Destinations are a closed sum type, dispatched exhaustively
//! - Namespaces are hash-derived so routers and components can share one store

pub mod declaration;
pub mod entry;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod namespace;
pub mod pattern;
pub mod registrar;
pub mod table;

pub use declaration::{BucketOutputs, Destination, FunctionOutputs, RouteDeclaration, SiteManifest};
pub use entry::{RouteEntry, RouteKind};
pub use error::{RouteError, RouteResult};
pub use matcher::select_route;
pub use metadata::RouteMetadata;
pub use registrar::Registrar;
pub use table::RouteTable;
