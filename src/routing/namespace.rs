//! Namespace derivation.
//!
//! A namespace is a short, deterministic identifier hashed from
//! `{app}-{stage}-{component}`. It scopes every store key a route owns.
//! Collisions are possible in principle but negligible at table sizes.

use sha2::{Digest, Sha256};

/// Length of derived namespaces.
pub const NAMESPACE_LEN: usize = 8;

const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Hash `input` into a lowercase alphanumeric string of `len` characters.
pub fn hash_to_pretty(input: &str, len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest
        .iter()
        .cycle()
        .take(len)
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

/// Namespace of `component` within an app stage.
pub fn derive(app: &str, stage: &str, component: &str) -> String {
    hash_to_pretty(&format!("{app}-{stage}-{component}"), NAMESPACE_LEN)
}
