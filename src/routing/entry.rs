//! Route entries: the compact `type,namespace,host,path` records of a table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Destination kind of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Url,
    Bucket,
    Site,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Url => "url",
            RouteKind::Bucket => "bucket",
            RouteKind::Site => "site",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteKind {
    type Err = EntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(RouteKind::Url),
            "bucket" => Ok(RouteKind::Bucket),
            "site" => Ok(RouteKind::Site),
            other => Err(EntryParseError(format!("unknown route type '{other}'"))),
        }
    }
}

/// A malformed serialized route entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route entry: {0}")]
pub struct EntryParseError(pub String);

/// One registered route: matching criteria plus the namespace of its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub kind: RouteKind,
    pub namespace: String,
    /// Empty (any host), an escaped literal host, or an escaped wildcard pattern.
    pub host: String,
    /// Path prefix, always starting with `/`.
    pub path: String,
}

impl RouteEntry {
    pub fn new(
        kind: RouteKind,
        namespace: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            host: host.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.kind, self.namespace, self.host, self.path)
    }
}

impl FromStr for RouteEntry {
    type Err = EntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Path is last so it may carry commas of its own.
        let mut parts = s.splitn(4, ',');
        let (Some(kind), Some(namespace), Some(host), Some(path)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(EntryParseError(format!("expected 4 fields in '{s}'")));
        };

        if namespace.is_empty() {
            return Err(EntryParseError(format!("empty namespace in '{s}'")));
        }
        if !path.starts_with('/') {
            return Err(EntryParseError(format!("path must start with '/' in '{s}'")));
        }

        Ok(Self {
            kind: kind.parse()?,
            namespace: namespace.to_string(),
            host: host.to_string(),
            path: path.to_string(),
        })
    }
}
