//! Viewer geolocation: normalized geo headers and nearest-server selection.

use axum::http::HeaderMap;

use crate::edge::request::EdgeRequest;
use crate::routing::metadata::ServerLocation;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geo headers supplied by the edge platform, and the suffix each is
/// forwarded under.
const GEO_HEADERS: [(&str, &str); 5] = [
    ("cloudfront-viewer-city", "city"),
    ("cloudfront-viewer-country", "country"),
    ("cloudfront-viewer-country-region", "region"),
    ("cloudfront-viewer-latitude", "latitude"),
    ("cloudfront-viewer-longitude", "longitude"),
];

/// Great-circle distance in kilometres between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Viewer `(latitude, longitude)` from the platform geo headers.
pub fn viewer_location(headers: &HeaderMap) -> Option<(f64, f64)> {
    let read = |name: &str| -> Option<f64> {
        let value: f64 = headers.get(name)?.to_str().ok()?.trim().parse().ok()?;
        value.is_finite().then_some(value)
    };
    Some((read("cloudfront-viewer-latitude")?, read("cloudfront-viewer-longitude")?))
}

/// Pick the server closest to the viewer.
///
/// `viewer` is only called when there is more than one server. Without a
/// viewer location the first server wins, as does the first of equally
/// distant servers.
pub fn nearest_server<F>(servers: &[ServerLocation], viewer: F) -> Option<&ServerLocation>
where
    F: FnOnce() -> Option<(f64, f64)>,
{
    if servers.len() <= 1 {
        return servers.first();
    }
    let Some((lat, lon)) = viewer() else {
        return servers.first();
    };

    let mut best = &servers[0];
    let mut best_distance = haversine_km(lat, lon, best.1, best.2);
    for server in &servers[1..] {
        let distance = haversine_km(lat, lon, server.1, server.2);
        if distance < best_distance {
            best = server;
            best_distance = distance;
        }
    }
    Some(best)
}

/// Copy the platform geo headers to `{prefix}-{city,country,region,latitude,longitude}`.
pub fn apply_geo_headers(request: &mut EdgeRequest, prefix: &str) {
    for (source, suffix) in GEO_HEADERS {
        if let Some(value) = request.header(source).map(str::to_string) {
            request.set_header(&format!("{prefix}-{suffix}"), &value);
        }
    }
}
