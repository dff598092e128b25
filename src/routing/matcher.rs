//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (any / exact / single-label wildcard)
//! - Match path prefix on segment boundaries
//! - Pick the most specific of all matching entries
//!
//! # Design Decisions
//! - Pure functions over a slice of entries: no store access, no state
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive
//! - Longest host pattern wins, then longest path; ties keep table order

use regex::Regex;

use crate::routing::entry::RouteEntry;
use crate::routing::pattern::HOST_WILDCARD;

/// Normalize a Host header value for matching: lowercase, port removed.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.to_ascii_lowercase()
}

/// Does the stored host `pattern` match the normalized request `host`?
pub fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern.is_empty() || pattern == regex::escape(host) {
        return true;
    }
    if !pattern.contains(HOST_WILDCARD) {
        return false;
    }
    match Regex::new(&format!("^{pattern}$")) {
        Ok(re) => re.is_match(host),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Ignoring uncompilable host pattern");
            false
        }
    }
}

/// Does `prefix` match `uri` on a path-segment boundary?
///
/// `/api` matches `/api`, `/api/` and `/api/users` but not `/apiextra`.
pub fn path_matches(prefix: &str, uri: &str) -> bool {
    if !uri.starts_with(prefix) {
        return false;
    }
    prefix == "/"
        || prefix.ends_with('/')
        || uri.len() == prefix.len()
        || uri.as_bytes()[prefix.len()] == b'/'
}

/// Select the most specific entry matching `host` and `uri`.
///
/// `host` must already be normalized (see [`normalize_host`]).
pub fn select_route<'a>(entries: &'a [RouteEntry], host: &str, uri: &str) -> Option<&'a RouteEntry> {
    let mut best: Option<&RouteEntry> = None;
    for entry in entries {
        if let Some(current) = best {
            let candidate = (entry.host.len(), entry.path.len());
            let winning = (current.host.len(), current.path.len());
            if candidate <= winning {
                continue;
            }
        }
        if host_matches(&entry.host, host) && path_matches(&entry.path, uri) {
            best = Some(entry);
        }
    }
    best
}
