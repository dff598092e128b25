//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (chunk size fits the store, timeouts > 0)
//! - Catch protocol mismatches (TLS listener without certificate)
//! - Detect duplicate route owners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Route patterns and destinations are checked by the registrar at
//!   registration time, not here

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, PLACEHOLDER_API_KEY};
use crate::store::chunked::MIN_CHUNK_BYTES;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new(
                "listener.tls",
                "a TLS listener requires both cert_path and key_path",
            ));
        }
    }

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }
    if config.app.stage.trim().is_empty() {
        errors.push(ValidationError::new("app.stage", "must not be empty"));
    }
    if config.router.name.trim().is_empty() {
        errors.push(ValidationError::new("router.name", "must not be empty"));
    }

    if config.router.chunk_size < MIN_CHUNK_BYTES {
        errors.push(ValidationError::new(
            "router.chunk_size",
            format!("must be at least {MIN_CHUNK_BYTES} bytes"),
        ));
    }
    if config.router.chunk_size > config.store.max_value_bytes {
        errors.push(ValidationError::new(
            "router.chunk_size",
            format!(
                "{} exceeds store.max_value_bytes ({})",
                config.router.chunk_size, config.store.max_value_bytes
            ),
        ));
    }
    if config.store.max_key_bytes < 64 {
        errors.push(ValidationError::new("store.max_key_bytes", "must be at least 64"));
    }

    if let Some(origin) = &config.edge.default_origin {
        match Url::parse(origin) {
            Ok(url) if url.host_str().is_some() && matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "edge.default_origin",
                format!("'{origin}' is not an http(s) URL"),
            )),
        }
    }
    if config.edge.geo_header_prefix.trim().is_empty() {
        errors.push(ValidationError::new("edge.geo_header_prefix", "must not be empty"));
    }
    if config.edge.cache_key_header.trim().is_empty() {
        errors.push(ValidationError::new("edge.cache_key_header", "must not be empty"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::new("timeouts.read_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.connection_attempts == 0 {
        errors.push(ValidationError::new(
            "timeouts.connection_attempts",
            "must be at least 1",
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin API is enabled",
            ));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.router.is_inline() && !config.routes.is_empty() {
        errors.push(ValidationError::new(
            "routes",
            "cannot declare routes on a router that uses inline_routes",
        ));
    }

    let mut components = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.component.trim().is_empty() {
            errors.push(ValidationError::new(format!("routes[{i}].component"), "must not be empty"));
        } else if !components.insert(route.component.as_str()) {
            errors.push(ValidationError::new(
                format!("routes[{i}].component"),
                format!("'{}' is declared more than once", route.component),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
