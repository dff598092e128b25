//! Route metadata: the full destination description stored per namespace.
//!
//! The blob carries no type tag of its own; the route entry's kind says how
//! to decode it.

use serde::{Deserialize, Serialize};

use crate::routing::entry::RouteKind;

/// Transport protocol towards a URL origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OriginProtocol {
    Http,
    #[default]
    Https,
}

impl OriginProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            OriginProtocol::Http => "http",
            OriginProtocol::Https => "https",
        }
    }
}

/// Per-route origin connection overrides. Durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<OriginProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_attempts: Option<u32>,
}

/// URI rewrite applied before dispatch: first match of `regex` becomes `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub regex: String,
    pub to: String,
}

/// Storage origin shared by bucket routes and site static assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Metadata {
    pub domain: String,
    /// Key prefix prepended to the request URI.
    #[serde(default)]
    pub dir: String,
    /// Sub-path prefixes served from storage.
    #[serde(default)]
    pub routes: Vec<String>,
}

/// Image optimizer endpoint of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub host: String,
    pub route: String,
}

/// A server instance of a site: `(host, latitude, longitude)`.
pub type ServerLocation = (String, f64, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketMetadata {
    #[serde(flatten)]
    pub s3: S3Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, rename = "custom404", skip_serializing_if = "Option::is_none")]
    pub custom_404: Option<String>,
    pub s3: S3Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<ServerLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,
}

/// Metadata of one route, one variant per destination kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteMetadata {
    Url(UrlMetadata),
    Bucket(BucketMetadata),
    Site(SiteMetadata),
}

impl RouteMetadata {
    pub fn kind(&self) -> RouteKind {
        match self {
            RouteMetadata::Url(_) => RouteKind::Url,
            RouteMetadata::Bucket(_) => RouteKind::Bucket,
            RouteMetadata::Site(_) => RouteKind::Site,
        }
    }

    pub fn rewrite(&self) -> Option<&Rewrite> {
        match self {
            RouteMetadata::Url(m) => m.rewrite.as_ref(),
            RouteMetadata::Bucket(m) => m.rewrite.as_ref(),
            RouteMetadata::Site(m) => m.rewrite.as_ref(),
        }
    }

    /// Serialize to the stored JSON form.
    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            RouteMetadata::Url(m) => serde_json::to_string(m),
            RouteMetadata::Bucket(m) => serde_json::to_string(m),
            RouteMetadata::Site(m) => serde_json::to_string(m),
        }
    }

    /// Parse a stored JSON blob as metadata of `kind`.
    pub fn decode(kind: RouteKind, raw: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            RouteKind::Url => RouteMetadata::Url(serde_json::from_str(raw)?),
            RouteKind::Bucket => RouteMetadata::Bucket(serde_json::from_str(raw)?),
            RouteKind::Site => RouteMetadata::Site(serde_json::from_str(raw)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_metadata_shape() {
        let meta = RouteMetadata::Url(UrlMetadata {
            host: "backend.internal".into(),
            origin: Some(OriginOverride {
                protocol: Some(OriginProtocol::Http),
                connection_attempts: Some(2),
                ..OriginOverride::default()
            }),
            rewrite: None,
        });
        let value: serde_json::Value = serde_json::from_str(&meta.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "host": "backend.internal",
                "origin": { "protocol": "http", "connectionAttempts": 2 }
            })
        );
    }

    #[test]
    fn test_bucket_metadata_is_flat() {
        let raw = r#"{"domain":"b.s3.amazonaws.com","dir":"/public","routes":["/docs"]}"#;
        let meta = RouteMetadata::decode(RouteKind::Bucket, raw).unwrap();
        let RouteMetadata::Bucket(bucket) = &meta else {
            panic!("expected bucket metadata");
        };
        assert_eq!(bucket.s3.dir, "/public");
        assert_eq!(bucket.s3.routes, vec!["/docs".to_string()]);
    }

    #[test]
    fn test_site_metadata_shape() {
        let raw = r#"{
            "base": "/docs",
            "custom404": "/404.html",
            "s3": { "domain": "site.s3.amazonaws.com", "dir": "/assets", "routes": ["/_next"] },
            "image": { "host": "img.lambda-url.aws", "route": "/_next/image" },
            "servers": [["us.lambda-url.aws", 38.9, -77.0], ["eu.lambda-url.aws", 50.1, 8.7]]
        }"#;
        let meta = RouteMetadata::decode(RouteKind::Site, raw).unwrap();
        assert_eq!(meta.kind(), RouteKind::Site);
        let RouteMetadata::Site(site) = meta else {
            panic!("expected site metadata");
        };
        assert_eq!(site.custom_404.as_deref(), Some("/404.html"));
        let servers = site.servers.unwrap();
        assert_eq!(servers[1], ("eu.lambda-url.aws".to_string(), 50.1, 8.7));
    }

    #[test]
    fn test_decode_with_wrong_kind_fails() {
        assert!(RouteMetadata::decode(RouteKind::Url, r#"{"domain":"x"}"#).is_err());
    }
}
