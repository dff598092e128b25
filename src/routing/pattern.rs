//! Route pattern parsing.
//!
//! A pattern combines an optional host and a path prefix:
//! `"dev.example.com/api"`, `"/api"`, `"api.example.com/"`, `"*.example.com"`.
//! The part before the first `/` is the host; the rest is the path prefix.

use crate::routing::error::{RouteError, RouteResult};

/// Regex fragment a leading `*` host label compiles to: exactly one label.
pub const HOST_WILDCARD: &str = "[^.]+";

/// A parsed pattern in stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// Escaped host pattern, empty for any host.
    pub host: String,
    /// Normalized path prefix.
    pub path: String,
}

fn invalid(pattern: &str, reason: impl Into<String>) -> RouteError {
    RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Parse a route pattern into its stored host and path forms.
pub fn parse_pattern(pattern: &str) -> RouteResult<RoutePattern> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(invalid(pattern, "pattern is empty"));
    }
    if trimmed.contains("://") {
        return Err(invalid(pattern, "pattern must not include a scheme"));
    }

    let (host, path) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, "/"),
    };

    Ok(RoutePattern {
        host: compile_host(pattern, host)?,
        path: normalize_path(pattern, path)?,
    })
}

fn compile_host(pattern: &str, host: &str) -> RouteResult<String> {
    if host.is_empty() {
        return Ok(String::new());
    }
    let host = host.to_ascii_lowercase();

    let valid_chars = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '*'));
    if !valid_chars {
        return Err(invalid(pattern, format!("invalid character in host '{host}'")));
    }
    if host.split('.').any(str::is_empty) {
        return Err(invalid(pattern, format!("empty label in host '{host}'")));
    }

    match host.strip_prefix("*.") {
        Some(rest) => {
            if rest.contains('*') {
                return Err(invalid(pattern, "only a single leading '*.' wildcard is supported"));
            }
            Ok(format!("{HOST_WILDCARD}\\.{}", regex::escape(rest)))
        }
        None if host.contains('*') => Err(invalid(
            pattern,
            "only a single leading '*.' wildcard is supported",
        )),
        None => Ok(regex::escape(&host)),
    }
}

fn normalize_path(pattern: &str, path: &str) -> RouteResult<String> {
    if path.chars().any(|c| c.is_whitespace() || matches!(c, '?' | '#' | '*')) {
        return Err(invalid(pattern, format!("invalid character in path '{path}'")));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(invalid(pattern, "path must not contain '..' segments"));
    }

    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(stripped.to_string())
    }
}
