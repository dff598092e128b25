//! The in-flight request as seen by the dispatcher.
//!
//! # Responsibilities
//! - Capture host, URI, query string and headers of an inbound request
//! - Provide header and cookie helpers used by the dispatch steps
//! - Carry the origin chosen for the request, if any

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::edge::origin::Origin;
use crate::routing::matcher::normalize_host;

/// A request being dispatched. Mutated in place by the dispatcher.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    pub method: Method,
    /// Lowercase host without port, used for matching.
    pub host: String,
    /// Request path, rewritten by dispatch.
    pub uri: String,
    pub querystring: Option<String>,
    pub headers: HeaderMap,
    /// Destination chosen by dispatch. `None` means pass-through.
    pub origin: Option<Origin>,
}

impl EdgeRequest {
    /// Build from the parts of an inbound HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority (HTTP/2).
    pub fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let raw_host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or_default();

        Self {
            method: method.clone(),
            host: normalize_host(raw_host),
            uri: uri.path().to_string(),
            querystring: uri.query().map(str::to_string),
            headers: headers.clone(),
            origin: None,
        }
    }

    /// Convenience constructor for a GET request.
    pub fn get(host: &str, uri: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(header::HOST, value);
        }
        Self {
            method: Method::GET,
            host: normalize_host(host),
            uri: uri.to_string(),
            querystring: None,
            headers,
            origin: None,
        }
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header, replacing any existing value. Invalid names or values
    /// are dropped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping header with invalid name or value"),
        }
    }

    /// The original `Host` header, as sent by the client.
    pub fn host_header(&self) -> &str {
        self.header(header::HOST.as_str()).unwrap_or(&self.host)
    }

    /// Value of a cookie, searching every `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn strip_cookies(&mut self) {
        self.headers.remove(header::COOKIE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_normalizes_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("Dev.Example.com:8443"));
        let uri: Uri = "/api/orders?page=2".parse().unwrap();

        let request = EdgeRequest::from_parts(&Method::POST, &uri, &headers);
        assert_eq!(request.host, "dev.example.com");
        assert_eq!(request.uri, "/api/orders");
        assert_eq!(request.querystring.as_deref(), Some("page=2"));
        assert_eq!(request.host_header(), "Dev.Example.com:8443");
        assert!(request.origin.is_none());
    }

    #[test]
    fn test_host_from_authority() {
        let uri: Uri = "https://h2.example.com/x".parse().unwrap();
        let request = EdgeRequest::from_parts(&Method::GET, &uri, &HeaderMap::new());
        assert_eq!(request.host, "h2.example.com");
    }

    #[test]
    fn test_cookies() {
        let mut request = EdgeRequest::get("example.com", "/");
        request.headers.append(header::COOKIE, HeaderValue::from_static("a=1; session=abc"));
        request.headers.append(header::COOKIE, HeaderValue::from_static("__prerender_bypass=xyz"));

        assert_eq!(request.cookie("session"), Some("abc"));
        assert_eq!(request.cookie("__prerender_bypass"), Some("xyz"));
        assert_eq!(request.cookie("missing"), None);

        request.strip_cookies();
        assert_eq!(request.cookie("a"), None);
    }

    #[test]
    fn test_set_header_rejects_invalid() {
        let mut request = EdgeRequest::get("example.com", "/");
        request.set_header("x-ok", "value");
        request.set_header("bad header", "value");
        assert_eq!(request.header("x-ok"), Some("value"));
        assert_eq!(request.headers.len(), 2);
    }
}
