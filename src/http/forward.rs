//! Upstream forwarding.
//!
//! # Responsibilities
//! - Resolve the upstream URL from the dispatched origin or the default origin
//! - Strip hop-by-hop headers in both directions
//! - Retry connection failures with backoff, up to the origin's attempt count
//! - Map upstream failures to 502 and timeouts to 504
//!
//! # Design Decisions
//! - The request body is buffered (bounded by the body limit) so it can be
//!   re-sent after a failed connect
//! - Response bodies are streamed back without buffering
//! - Redirects are passed through to the client, never followed

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::edge::origin::{join_url, Origin};
use crate::edge::request::EdgeRequest;
use crate::edge::EdgeSettings;
use crate::resilience::backoff::ConnectBackoff;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Where and how to send one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub url: String,
    pub attempts: u32,
    pub timeout: Duration,
}

impl UpstreamTarget {
    /// Resolve the target of a dispatched request. `None` when the request
    /// has no origin and no default origin is configured.
    pub fn resolve(request: &EdgeRequest, settings: &EdgeSettings) -> Option<Self> {
        let defaults = &settings.origin_defaults;
        let query = request.querystring.as_deref();
        let target = match &request.origin {
            Some(origin @ Origin::Url(url)) => Self {
                url: origin.target_url(&request.uri, query),
                attempts: url.connection_attempts,
                timeout: url.connect_timeout + url.read_timeout,
            },
            Some(origin @ Origin::Bucket(_)) => Self {
                url: origin.target_url(&request.uri, query),
                attempts: defaults.connection_attempts,
                timeout: defaults.connect_timeout + defaults.read_timeout,
            },
            None => Self {
                url: join_url(settings.edge.default_origin.as_deref()?, &request.uri, query),
                attempts: defaults.connection_attempts,
                timeout: defaults.connect_timeout + defaults.read_timeout,
            },
        };
        Some(target)
    }
}

/// Sends dispatched requests to their origin.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    backoff: ConnectBackoff,
    max_body_size: usize,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;

        Ok(Self {
            client,
            backoff: ConnectBackoff::from_timeouts(&config.timeouts),
            max_body_size: config.security.max_body_size,
        })
    }

    /// Forward `request` with `body` and turn the upstream answer into a response.
    pub async fn forward(&self, request: EdgeRequest, body: Body, settings: &EdgeSettings, request_id: &str) -> Response {
        let Some(target) = UpstreamTarget::resolve(&request, settings) else {
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        };

        let body: Bytes = match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        };

        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .request(request.method.clone(), &target.url)
                .headers(headers.clone())
                .timeout(target.timeout)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(upstream) => {
                    tracing::debug!(
                        request_id = %request_id,
                        url = %target.url,
                        status = %upstream.status(),
                        attempt,
                        "Upstream responded"
                    );
                    return into_response(upstream);
                }
                Err(e) if e.is_connect() && attempt < target.attempts => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        request_id = %request_id,
                        url = %target.url,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Origin connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_timeout() => {
                    tracing::error!(request_id = %request_id, url = %target.url, error = %e, "Upstream timed out");
                    return (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response();
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, url = %target.url, attempt, error = %e, "Upstream error");
                    return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
                }
            }
        }
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn into_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeConfig;
    use crate::edge::origin::{BucketOrigin, OriginDefaults, UrlOrigin};
    use crate::routing::metadata::OriginOverride;
    use axum::http::HeaderValue;

    fn settings(default_origin: Option<&str>) -> EdgeSettings {
        EdgeSettings {
            edge: EdgeConfig {
                default_origin: default_origin.map(str::to_string),
                ..EdgeConfig::default()
            },
            origin_defaults: OriginDefaults::default(),
        }
    }

    #[test]
    fn test_resolve_url_origin() {
        let mut request = EdgeRequest::get("example.com", "/api/orders");
        request.querystring = Some("page=2".into());
        let overrides = OriginOverride {
            connection_timeout: Some(2),
            read_timeout: Some(3),
            connection_attempts: Some(1),
            ..OriginOverride::default()
        };
        request.origin = Some(Origin::Url(UrlOrigin::new(
            "backend.internal",
            Some(&overrides),
            &OriginDefaults::default(),
        )));

        let target = UpstreamTarget::resolve(&request, &settings(None)).unwrap();
        assert_eq!(target.url, "https://backend.internal/api/orders?page=2");
        assert_eq!(target.attempts, 1);
        assert_eq!(target.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_bucket_and_default() {
        let mut request = EdgeRequest::get("example.com", "/a.png");
        assert!(UpstreamTarget::resolve(&request, &settings(None)).is_none());

        let target = UpstreamTarget::resolve(&request, &settings(Some("http://127.0.0.1:3000/"))).unwrap();
        assert_eq!(target.url, "http://127.0.0.1:3000/a.png");
        assert_eq!(target.attempts, 3);

        request.origin = Some(Origin::Bucket(BucketOrigin::new("b.s3.amazonaws.com")));
        let target = UpstreamTarget::resolve(&request, &settings(None)).unwrap();
        assert_eq!(target.url, "https://b.s3.amazonaws.com/a.png");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }
}
