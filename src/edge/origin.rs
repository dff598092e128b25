//! Origins a request can be dispatched to.

use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::routing::metadata::{OriginOverride, OriginProtocol};

/// Connection settings applied to URL origins without an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginDefaults {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub keep_alive_timeout: Duration,
    pub connection_attempts: u32,
}

impl OriginDefaults {
    pub fn from_timeouts(timeouts: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(timeouts.connect_secs),
            read_timeout: Duration::from_secs(timeouts.read_secs),
            keep_alive_timeout: Duration::from_secs(5),
            connection_attempts: timeouts.connection_attempts.max(1),
        }
    }
}

impl Default for OriginDefaults {
    fn default() -> Self {
        Self::from_timeouts(&TimeoutConfig::default())
    }
}

/// A custom HTTP(S) origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOrigin {
    pub domain: String,
    pub protocol: OriginProtocol,
    pub port: Option<u16>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub keep_alive_timeout: Duration,
    pub connection_attempts: u32,
}

impl UrlOrigin {
    /// Origin for `domain`, with `overrides` layered over `defaults`.
    pub fn new(domain: impl Into<String>, overrides: Option<&OriginOverride>, defaults: &OriginDefaults) -> Self {
        let o = overrides.cloned().unwrap_or_default();
        Self {
            domain: domain.into(),
            protocol: o.protocol.unwrap_or_default(),
            port: o.port,
            connect_timeout: o.connection_timeout.map(Duration::from_secs).unwrap_or(defaults.connect_timeout),
            read_timeout: o.read_timeout.map(Duration::from_secs).unwrap_or(defaults.read_timeout),
            keep_alive_timeout: o
                .keep_alive_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.keep_alive_timeout),
            connection_attempts: o.connection_attempts.unwrap_or(defaults.connection_attempts).max(1),
        }
    }

    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.protocol.scheme(), self.domain, port),
            None => format!("{}://{}", self.protocol.scheme(), self.domain),
        }
    }
}

/// How requests to a storage origin are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginAccessControl {
    pub signing_protocol: &'static str,
    pub signing_behavior: &'static str,
}

impl Default for OriginAccessControl {
    fn default() -> Self {
        Self {
            signing_protocol: "sigv4",
            signing_behavior: "always",
        }
    }
}

/// A storage bucket origin. Always HTTPS, never sees cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOrigin {
    pub domain: String,
    pub access_control: OriginAccessControl,
}

impl BucketOrigin {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            access_control: OriginAccessControl::default(),
        }
    }
}

/// Destination of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Url(UrlOrigin),
    Bucket(BucketOrigin),
}

impl Origin {
    pub fn domain(&self) -> &str {
        match self {
            Origin::Url(o) => &o.domain,
            Origin::Bucket(o) => &o.domain,
        }
    }

    pub fn base_url(&self) -> String {
        match self {
            Origin::Url(o) => o.base_url(),
            Origin::Bucket(o) => format!("https://{}", o.domain),
        }
    }

    /// Full upstream URL for `uri` and an optional query string.
    pub fn target_url(&self, uri: &str, querystring: Option<&str>) -> String {
        join_url(&self.base_url(), uri, querystring)
    }
}

/// Append a path and optional query to a base URL without a trailing slash.
pub fn join_url(base: &str, uri: &str, querystring: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    match querystring {
        Some(q) if !q.is_empty() => format!("{base}{uri}?{q}"),
        _ => format!("{base}{uri}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_origin_defaults() {
        let origin = UrlOrigin::new("backend.internal", None, &OriginDefaults::default());
        assert_eq!(origin.protocol, OriginProtocol::Https);
        assert_eq!(origin.connection_attempts, 3);
        assert_eq!(origin.connect_timeout, Duration::from_secs(10));
        assert_eq!(origin.base_url(), "https://backend.internal");
    }

    #[test]
    fn test_url_origin_overrides() {
        let overrides = OriginOverride {
            protocol: Some(OriginProtocol::Http),
            port: Some(8080),
            read_timeout: Some(5),
            connection_attempts: Some(0),
            ..OriginOverride::default()
        };
        let origin = UrlOrigin::new("127.0.0.1", Some(&overrides), &OriginDefaults::default());
        assert_eq!(origin.base_url(), "http://127.0.0.1:8080");
        assert_eq!(origin.read_timeout, Duration::from_secs(5));
        assert_eq!(origin.connection_attempts, 1);
    }

    #[test]
    fn test_target_url() {
        let origin = Origin::Bucket(BucketOrigin::new("b.s3.amazonaws.com"));
        assert_eq!(
            origin.target_url("/assets/index.html", Some("v=1")),
            "https://b.s3.amazonaws.com/assets/index.html?v=1"
        );
        assert_eq!(join_url("http://fallback:3000/", "/x", Some("")), "http://fallback:3000/x");
    }
}
