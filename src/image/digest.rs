//! Content digest helpers
//!
//! Digests are never computed here: the registry is the authority on content
//! addressing, so these helpers only check the shape of digests it returns.

/// Utilities for working with registry content digests
pub struct DigestUtils;

impl DigestUtils {
    /// Validate `<algorithm>:<hex>` with a known algorithm and matching hex length
    pub fn is_valid_digest(digest: &str) -> bool {
        let Some((algorithm, hex)) = digest.split_once(':') else {
            return false;
        };
        let expected_len = match algorithm {
            "sha256" => 64,
            "sha384" => 96,
            "sha512" => 128,
            _ => return false,
        };
        hex.len() == expected_len && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    /// Shortened form for log lines, e.g. `sha256:b94d27b9934d`
    pub fn short(digest: &str) -> &str {
        match digest.split_once(':') {
            Some((algorithm, hex)) if hex.len() > 12 => &digest[..algorithm.len() + 1 + 12],
            _ => digest,
        }
    }
}
