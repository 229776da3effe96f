//! Registry key schema.
//!
//! Slice records live under `bufferhosts/all_slices/<hostname>/<device>`,
//! assignments under `bufferhosts/assigned_slices/<hostname>/<device>`.

use crate::error::AgentError;

pub const ALL_SLICES_ROOT: &str = "bufferhosts/all_slices";
pub const ASSIGNED_SLICES_ROOT: &str = "bufferhosts/assigned_slices";
pub const SEPARATOR: char = '/';

/// Reject segments that would escape their namespace level.
pub fn validate_segment(kind: &'static str, value: &str) -> Result<(), AgentError> {
    if value.is_empty() || value.contains(SEPARATOR) {
        return Err(AgentError::InvalidKeySegment {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// `bufferhosts/assigned_slices/<hostname>`
pub fn assigned_slices(hostname: &str) -> Result<String, AgentError> {
    validate_segment("hostname", hostname)?;
    Ok(format!("{}/{}", ASSIGNED_SLICES_ROOT, hostname))
}

/// `bufferhosts/all_slices/<hostname>/<device>`
pub fn all_slices(hostname: &str, device: &str) -> Result<String, AgentError> {
    validate_segment("hostname", hostname)?;
    validate_segment("device", device)?;
    Ok(format!("{}/{}/{}", ALL_SLICES_ROOT, hostname, device))
}

/// Scan prefix for every slice record of a host, separator included.
pub fn all_slices_scan(hostname: &str) -> Result<String, AgentError> {
    validate_segment("hostname", hostname)?;
    Ok(format!("{}/{}{}", ALL_SLICES_ROOT, hostname, SEPARATOR))
}

/// Turn a namespace prefix into the scan prefix for its children.
///
/// `host1` must never match `host10/...`, so scans always end in the separator.
pub fn scan_prefix(prefix: &str) -> String {
    format!("{}{}", prefix, SEPARATOR)
}

/// Recover the device name from a full key under `prefix`.
///
/// Returns `None` when the key is not a child of `prefix`. The remainder is
/// returned verbatim, including any nested separators, so callers can reject it.
pub fn device_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix(SEPARATOR)
}
