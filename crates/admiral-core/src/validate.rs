//! # Validation
//!
//! Field rules of the request bodies. Each check returns the crate's
//! `InvalidRequest` error with a message naming the offending field.

use crate::{Error, Result};

/// Longest workspace name, in characters.
pub const MAX_WORKSPACE_NAME_CHARS: usize = 40;

/// Longest email address, in bytes.
pub const MAX_EMAIL_BYTES: usize = 254;

/// Longest `custom_id`, in characters.
pub const MAX_CUSTOM_ID_CHARS: usize = 64;

/// Workspace names are 1 to 40 characters and not blank.
pub fn workspace_name(name: &str) -> Result<()> {
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_WORKSPACE_NAME_CHARS {
        return Err(Error::invalid(format!(
            "name: must be between 1 and {} characters, got {}",
            MAX_WORKSPACE_NAME_CHARS, chars
        )));
    }
    if name.trim().is_empty() {
        return Err(Error::invalid("name: must not be blank"));
    }
    Ok(())
}

/// A pragmatic address check: one `@`, a local part, a dotted domain.
pub fn email(address: &str) -> Result<()> {
    let bad = || Error::invalid(format!("email: '{}' is not a valid email address", address));

    if address.is_empty() || address.len() > MAX_EMAIL_BYTES {
        return Err(bad());
    }
    if address.chars().any(char::is_whitespace) {
        return Err(bad());
    }
    let mut parts = address.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(bad());
    };
    if local.is_empty() || domain.is_empty() {
        return Err(bad());
    }
    let interior_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !interior_dot || domain.contains("..") {
        return Err(bad());
    }
    Ok(())
}

/// `custom_id` values are 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn custom_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= MAX_CUSTOM_ID_CHARS
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !ok {
        return Err(Error::invalid(format!(
            "custom_id: '{}' must be 1-{} characters of letters, digits, '_' or '-'",
            id, MAX_CUSTOM_ID_CHARS
        )));
    }
    Ok(())
}

/// Display colors are `#` followed by six hex digits.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}
