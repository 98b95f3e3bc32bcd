//! Base URL and relative path resolution.

use url::Url;

use crate::Result;

/// Resolve `reference` against `base` per RFC 3986 §5.2.
///
/// An absolute `reference` ignores the base. A relative one is joined
/// against it: with base `http://h/v1/api/`, `user/profile` resolves to
/// `http://h/v1/api/user/profile`; with base `http://h/v1/api` (no trailing
/// slash) it replaces the last segment and resolves to
/// `http://h/v1/user/profile`. Without a base, `reference` must be an
/// absolute URL.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the reference
/// cannot be parsed or resolved.
pub fn resolve_reference(base: Option<&Url>, reference: &str) -> Result<Url> {
    let resolved = match base {
        Some(base) => base.join(reference)?,
        None => Url::parse(reference)?,
    };
    Ok(resolved)
}
