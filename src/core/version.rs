//! Version ordering and latest-version resolution

use std::cmp::Ordering;

/// Compare two version strings
///
/// Versions that parse as semantic versions are ordered numerically, so
/// "1.10.0" ranks above "1.9.0". A parseable version always ranks above an
/// unparseable one, and two unparseable versions fall back to byte-wise
/// string order, giving a total order over arbitrary strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let ver_a = semver::Version::parse(a).ok();
    let ver_b = semver::Version::parse(b).ok();
    match (ver_a, ver_b) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Check if `candidate` is strictly newer than `existing`
pub fn is_newer(candidate: &str, existing: &str) -> bool {
    compare_versions(candidate, existing) == Ordering::Greater
}

/// Pick the highest version, or `None` when there are no versions
pub fn resolve_latest<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
