//! Cache key for requests forwarded to site servers.
//!
//! The key hashes only the headers that change what a server renders, so
//! unrelated header variation does not fragment the downstream cache.

use md5::{Digest, Md5};

use crate::edge::request::EdgeRequest;

const IMAGE_OPTIMIZER_PREFIX: &str = "/_next/image";
const PRERENDER_BYPASS_COOKIE: &str = "__prerender_bypass";
const CLASSIFYING_HEADERS: [&str; 5] = [
    "rsc",
    "next-router-prefetch",
    "next-router-state-tree",
    "next-url",
    "x-prerender-revalidate",
];

/// MD5 hex digest of the request-classifying headers and cookie.
pub fn compute(request: &EdgeRequest) -> String {
    let mut material = String::new();
    if request.uri.starts_with(IMAGE_OPTIMIZER_PREFIX) {
        material.push_str(request.header("accept").unwrap_or_default());
    } else {
        for name in CLASSIFYING_HEADERS {
            material.push_str(request.header(name).unwrap_or_default());
        }
    }
    if let Some(bypass) = request.cookie(PRERENDER_BYPASS_COOKIE) {
        material.push_str(bypass);
    }
    hex::encode(Md5::digest(material.as_bytes()))
}

/// Compute the cache key and write it to `header`.
pub fn apply(request: &mut EdgeRequest, header: &str) {
    let key = compute(request);
    request.set_header(header, &key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_material() {
        let request = EdgeRequest::get("example.com", "/");
        assert_eq!(compute(&request), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_ignores_unrelated_headers() {
        let mut a = EdgeRequest::get("example.com", "/page");
        let mut b = EdgeRequest::get("example.com", "/page");
        a.set_header("rsc", "1");
        b.set_header("rsc", "1");
        b.set_header("user-agent", "curl/8");
        assert_eq!(compute(&a), compute(&b));

        b.set_header("next-url", "/other");
        assert_ne!(compute(&a), compute(&b));
    }

    #[test]
    fn test_image_requests_key_on_accept() {
        let mut request = EdgeRequest::get("example.com", "/_next/image?url=/a.png");
        request.set_header("rsc", "1");
        let without_accept = compute(&request);
        assert_eq!(without_accept, "d41d8cd98f00b204e9800998ecf8427e");

        request.set_header("accept", "image/webp");
        assert_eq!(compute(&request), hex::encode(Md5::digest(b"image/webp")));
    }

    #[test]
    fn test_prerender_bypass_cookie_included() {
        let mut request = EdgeRequest::get("example.com", "/");
        request.set_header("cookie", "__prerender_bypass=secret; theme=dark");
        assert_eq!(compute(&request), hex::encode(Md5::digest(b"secret")));

        apply(&mut request, "x-open-next-cache-key");
        assert_eq!(request.header("x-open-next-cache-key"), Some(hex::encode(Md5::digest(b"secret")).as_str()));
    }
}
