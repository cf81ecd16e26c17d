//! # Headers
//!
//! Request headers every endpoint of the contract understands.
//!
//! - `anthropic-version`: required on every request.
//! - `anthropic-beta`: optional; a comma-separated list, and the header may
//!   also be repeated.
//! - `x-api-key`: required; admin-scoped keys for the organization endpoints,
//!   workspace-scoped keys for message batches.

use std::fmt;

/// `anthropic-version` header name.
pub const ANTHROPIC_VERSION: &str = "anthropic-version";

/// `anthropic-beta` header name.
pub const ANTHROPIC_BETA: &str = "anthropic-beta";

/// `x-api-key` header name.
pub const X_API_KEY: &str = "x-api-key";

/// API versions the contract recognises.
pub const SUPPORTED_VERSIONS: [&str; 2] = ["2023-01-01", "2023-06-01"];

/// Version sent when the caller does not choose one.
pub const DEFAULT_VERSION: &str = "2023-06-01";

const ADMIN_KEY_PREFIX: &str = "sk-ant-admin";
const WORKSPACE_KEY_PREFIX: &str = "sk-ant-api";

/// Whether `version` is a recognised `anthropic-version` value.
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// Collect beta flags from every `anthropic-beta` header value.
///
/// Values are split on commas and trimmed; empty entries are dropped and
/// duplicates keep their first position.
pub fn parse_betas<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut betas: Vec<String> = Vec::new();
    for value in values {
        for beta in value.split(',').map(str::trim).filter(|b| !b.is_empty()) {
            if !betas.iter().any(|seen| seen == beta) {
                betas.push(beta.to_string());
            }
        }
    }
    betas
}

/// Which family of endpoints a key may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    /// Organization administration (`/v1/organizations/...`).
    Admin,
    /// Workspace resources (`/v1/messages/...`).
    Workspace,
}

impl KeyScope {
    /// Classify a key by its prefix. Unknown shapes have no scope.
    #[must_use]
    pub fn of(key: &str) -> Option<Self> {
        if key.starts_with(ADMIN_KEY_PREFIX) {
            Some(Self::Admin)
        } else if key.starts_with(WORKSPACE_KEY_PREFIX) {
            Some(Self::Workspace)
        } else {
            None
        }
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Workspace => f.write_str("workspace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions() {
        assert!(is_supported_version("2023-06-01"));
        assert!(is_supported_version("2023-01-01"));
        assert!(!is_supported_version("2099-01-01"));
        assert!(!is_supported_version(""));
        assert!(is_supported_version(DEFAULT_VERSION));
    }

    #[test]
    fn betas_split_trim_and_dedupe() {
        let betas = parse_betas(["message-batches-2024-09-24, prompt-caching-2024-07-31"]);
        assert_eq!(
            betas,
            vec!["message-batches-2024-09-24", "prompt-caching-2024-07-31"]
        );

        let repeated = parse_betas(["a", "b,a", " , c ,"]);
        assert_eq!(repeated, vec!["a", "b", "c"]);

        assert!(parse_betas(std::iter::empty()).is_empty());
    }

    #[test]
    fn key_scopes() {
        assert_eq!(KeyScope::of("sk-ant-admin01-xyz"), Some(KeyScope::Admin));
        assert_eq!(KeyScope::of("sk-ant-api03-xyz"), Some(KeyScope::Workspace));
        assert_eq!(KeyScope::of("hunter2"), None);
        assert_eq!(KeyScope::Admin.to_string(), "admin");
    }
}
