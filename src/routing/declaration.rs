//! Route declarations: what a component hands to the registrar.

use serde::{Deserialize, Serialize};

use crate::routing::entry::RouteKind;
use crate::routing::metadata::{ImageMetadata, OriginOverride, Rewrite, S3Metadata, ServerLocation};

/// Outputs of a function-like component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionOutputs {
    pub url: String,
    pub arn: String,
}

/// Outputs of a bucket-like component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketOutputs {
    pub regional_domain: String,
    pub arn: String,
}

/// Manifest of a static site with optional server and image components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteManifest {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default, rename = "custom404")]
    pub custom_404: Option<String>,
    pub s3: S3Metadata,
    #[serde(default)]
    pub image: Option<ImageMetadata>,
    #[serde(default)]
    pub servers: Vec<ServerLocation>,
    /// Static file paths (e.g. `/index.html`) served by exact match.
    #[serde(default)]
    pub files: Vec<String>,
}

/// Where a route sends matching requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Destination {
    Url {
        url: String,
    },
    Bucket {
        domain: String,
        #[serde(default)]
        dir: Option<String>,
        #[serde(default)]
        routes: Vec<String>,
    },
    Site(SiteManifest),
}

impl Destination {
    pub fn kind(&self) -> RouteKind {
        match self {
            Destination::Url { .. } => RouteKind::Url,
            Destination::Bucket { .. } => RouteKind::Bucket,
            Destination::Site(_) => RouteKind::Site,
        }
    }
}

impl From<&FunctionOutputs> for Destination {
    fn from(function: &FunctionOutputs) -> Self {
        Destination::Url {
            url: function.url.clone(),
        }
    }
}

impl From<&BucketOutputs> for Destination {
    fn from(bucket: &BucketOutputs) -> Self {
        Destination::Bucket {
            domain: bucket.regional_domain.clone(),
            dir: None,
            routes: Vec::new(),
        }
    }
}

/// A route as declared by its owning component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub pattern: String,
    pub destination: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginOverride>,
}

impl RouteDeclaration {
    pub fn new(pattern: impl Into<String>, destination: Destination) -> Self {
        Self {
            pattern: pattern.into(),
            destination,
            rewrite: None,
            origin: None,
        }
    }

    pub fn with_rewrite(mut self, regex: impl Into<String>, to: impl Into<String>) -> Self {
        self.rewrite = Some(Rewrite {
            regex: regex.into(),
            to: to.into(),
        });
        self
    }

    pub fn with_origin(mut self, origin: OriginOverride) -> Self {
        self.origin = Some(origin);
        self
    }
}
