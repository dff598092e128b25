//! Edge dispatch subsystem (request-time).
//!
//! # Data Flow
//! ```text
//! EdgeRequest (host, uri, headers)
//!     → dispatcher.rs (load table, select route, load metadata, rewrite)
//!     → url    : UrlOrigin + x-forwarded-host
//!     → bucket : BucketOrigin, cookies stripped, dir prefixed
//!     → site   : site.rs (files → storage routes → 404 → image → servers)
//!                  geo.rs (nearest server, geo headers)
//!                  cache_key.rs
//!     → EdgeOutcome handed to the HTTP layer for forwarding
//! ```
//!
//! # Design Decisions
//! - Store failures never surface; the request passes through unrouted
//! - The dispatcher only reads the store
//! - Settings are swapped atomically on config reload

pub mod cache_key;
pub mod dispatcher;
pub mod geo;
pub mod origin;
pub mod request;
pub mod site;

use crate::config::{EdgeConfig, ProxyConfig};

pub use dispatcher::{Dispatcher, EdgeOutcome};
pub use origin::{BucketOrigin, Origin, OriginDefaults, UrlOrigin};
pub use request::EdgeRequest;

/// Hot-reloadable request-time settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSettings {
    pub edge: EdgeConfig,
    pub origin_defaults: OriginDefaults,
}

impl EdgeSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            edge: config.edge.clone(),
            origin_defaults: OriginDefaults::from_timeouts(&config.timeouts),
        }
    }
}
