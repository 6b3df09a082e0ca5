//! Storage key derivation for published artifacts
//!
//! Keys have the form `{name}-{version}` or `{name}-{version}-{ext}` with the
//! version escaped into a filesystem-safe alphabet. The escaping is
//! invertible, so distinct (name, version) pairs can never map to the same
//! key, which the metadata store's uniqueness guarantee relies on.

use crate::core::service::PackageName;

/// Longest extension section carried over from an uploaded filename
const MAX_EXTENSION_LEN: usize = 16;

/// Compute the storage key for a package version
///
/// The key is a pure function of its inputs and always a single path
/// component: names are alphanumeric, the version is escaped, and the
/// extension section is filtered down to lowercase alphanumerics. Anything
/// hostile in `original_filename` (directories, dot-dot segments) is
/// discarded rather than sanitized in place.
pub fn locate_for_write(name: &PackageName, version: &str, original_filename: &str) -> String {
    let mut key = format!("{}-{}", name.as_str(), encode_version(version));
    if let Some(ext) = sanitize_extension(original_filename) {
        key.push('-');
        key.push_str(&ext);
    }
    key
}

/// Escape a version string into the alphabet `[A-Za-z0-9._]`
///
/// ASCII alphanumerics and dots pass through; every other byte becomes
/// `_hh` (two lowercase hex digits, `_` itself included). A dot directly
/// following a dot is escaped too, so the output can never contain a `..`
/// segment. Escaping is unambiguous because a literal underscore never
/// survives unescaped.
fn encode_version(version: &str) -> String {
    let mut out = String::with_capacity(version.len());
    let mut last_was_dot = false;
    for &b in version.as_bytes() {
        if b == b'.' && !last_was_dot {
            out.push('.');
            last_was_dot = true;
        } else if b != b'.' && b.is_ascii_alphanumeric() {
            out.push(b as char);
            last_was_dot = false;
        } else {
            out.push('_');
            out.push_str(&format!("{:02x}", b));
            last_was_dot = false;
        }
    }
    out
}

/// Extract a safe extension section from an uploaded filename
fn sanitize_extension(original_filename: &str) -> Option<String> {
    let ext = std::path::Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())?;
    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXTENSION_LEN)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
