//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! router. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::routing::RouteDeclaration;

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Application identity used to derive namespaces.
    pub app: AppConfig,

    /// Router identity and registration mode.
    pub router: RouterConfig,

    /// Key-value store limits and persistence.
    pub store: StoreConfig,

    /// Request-time dispatch settings.
    pub edge: EdgeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    /// Routes registered at startup (and re-applied on reload).
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Application identity. Namespaces hash `{name}-{stage}-{component}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub stage: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            stage: "dev".to_string(),
        }
    }
}

/// Router identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    /// Component name of the router; its namespace scopes the route table.
    pub name: String,

    /// Maximum bytes per stored chunk of the route table.
    pub chunk_size: usize,

    /// Deprecated inline routes (`pattern → url`). When non-empty the router
    /// is fixed at startup and rejects dynamic registration.
    pub inline_routes: BTreeMap<String, String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name: "Router".to_string(),
            chunk_size: 1000,
            inline_routes: BTreeMap::new(),
        }
    }
}

impl RouterConfig {
    /// True when the router uses the deprecated inline-routes mode.
    pub fn is_inline(&self) -> bool {
        !self.inline_routes.is_empty()
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum key length in bytes.
    pub max_key_bytes: usize,

    /// Maximum value length in bytes.
    pub max_value_bytes: usize,

    /// Optional JSON snapshot file, loaded at startup and written on shutdown.
    pub persistence_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: 512,
            max_value_bytes: 1024,
            persistence_path: None,
        }
    }
}

/// Request-time dispatch settings. Hot-reloadable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EdgeConfig {
    /// Origin used when no route matches (e.g. "http://127.0.0.1:3000").
    /// Unmatched requests get 404 when unset.
    pub default_origin: Option<String>,

    /// Requests whose host ends with this suffix are rejected with 403.
    pub blocked_host_suffix: Option<String>,

    /// Prefix for normalized geo headers forwarded to site servers.
    pub geo_header_prefix: String,

    /// Header carrying the computed cache key for site servers.
    pub cache_key_header: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            default_origin: None,
            blocked_host_suffix: None,
            geo_header_prefix: "x-open-next".to_string(),
            cache_key_header: "x-open-next-cache-key".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default origin connection timeout in seconds.
    pub connect_secs: u64,

    /// Default origin read timeout in seconds.
    pub read_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Default number of origin connection attempts.
    pub connection_attempts: u32,

    /// Base delay between connection attempts in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between connection attempts in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 30,
            request_secs: 60,
            connection_attempts: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder admin key; validation refuses it while the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// A route declared in the config file or submitted to the admin API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Owning component name; hashed into the route namespace.
    pub component: String,

    #[serde(flatten)]
    pub route: RouteDeclaration,
}
