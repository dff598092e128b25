//! Route seeding at startup and re-application on config reload.

use std::collections::HashMap;

use crate::config::{ProxyConfig, RouteConfig};
use crate::routing::error::RouteResult;
use crate::routing::registrar::Registrar;

/// Write the routes the config declares. Any failure is fatal.
pub async fn seed_routes(registrar: &Registrar, config: &ProxyConfig) -> RouteResult<usize> {
    if registrar.is_inline() {
        return Ok(registrar.seed_inline(&config.router.inline_routes).await?.len());
    }
    for route in &config.routes {
        registrar.register(&route.component, &route.route).await?;
    }
    tracing::info!(routes = config.routes.len(), "Declared routes registered");
    Ok(config.routes.len())
}

/// Outcome of re-applying declared routes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub registered: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Bring the store in line with a reloaded route list: changed or new
/// routes are registered, routes dropped from the config are removed.
/// Failures are logged and counted, never fatal.
pub async fn reconcile_routes(registrar: &Registrar, previous: &[RouteConfig], next: &[RouteConfig]) -> ReloadSummary {
    let mut summary = ReloadSummary::default();
    if registrar.is_inline() {
        return summary;
    }

    let before: HashMap<&str, &RouteConfig> = previous.iter().map(|r| (r.component.as_str(), r)).collect();

    for route in next {
        if before.get(route.component.as_str()) == Some(&route) {
            continue;
        }
        match registrar.register(&route.component, &route.route).await {
            Ok(_) => summary.registered += 1,
            Err(e) => {
                tracing::error!(component = %route.component, error = %e, "Failed to apply reloaded route");
                summary.failed += 1;
            }
        }
    }

    for route in previous {
        if next.iter().any(|r| r.component == route.component) {
            continue;
        }
        match registrar.deregister(&route.component).await {
            Ok(_) => summary.removed += 1,
            Err(e) => {
                tracing::error!(component = %route.component, error = %e, "Failed to remove route");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        registered = summary.registered,
        removed = summary.removed,
        failed = summary.failed,
        "Declared routes reconciled"
    );
    summary
}
