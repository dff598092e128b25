//! Registration error definitions.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while registering or removing routes.
///
/// All variants except `Store` are configuration errors: the declaration
/// itself is wrong and retrying will not help.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The router was created with inline routes and cannot accept dynamic ones.
    #[error("router '{router}' uses inline routes; dynamic route registration is not supported")]
    InlineRoutesMode { router: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid route destination: {0}")]
    InvalidDestination(String),

    #[error("invalid rewrite regex '{regex}': {source}")]
    InvalidRewrite {
        regex: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("route metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl RouteError {
    /// True for errors caused by the route declaration rather than the store.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, RouteError::Store(_))
    }
}

/// Result type for registration operations.
pub type RouteResult<T> = Result<T, RouteError>;
