//! # Identifiers
//!
//! Opaque, prefixed resource identifiers.
//!
//! | Resource | Prefix |
//! |---|---|
//! | Invite | `invite_` |
//! | Workspace | `wrkspc_` |
//! | Message batch | `msgbatch_` |
//!
//! The suffix after the prefix is non-empty ASCII alphanumeric. Generated
//! suffixes are always 24 characters: `01` followed by two 11-digit base62
//! blocks derived from a sequence number through a bijective scramble, so two
//! different sequence numbers never produce the same id.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Odd multiplier, so multiplication is a bijection on u64.
const SCRAMBLE_MUL: u64 = 0x9E37_79B9_7F4A_7C15;
const SCRAMBLE_XOR: u64 = 0x5851_F42D_4C95_7F2D;

/// Length of a generated suffix.
pub const GENERATED_SUFFIX_LEN: usize = 24;

/// Errors from parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid {kind} id '{value}': expected prefix '{prefix}'")]
    WrongPrefix {
        kind: &'static str,
        prefix: &'static str,
        value: String,
    },

    #[error("invalid {kind} id '{value}': suffix must be non-empty and alphanumeric")]
    BadSuffix { kind: &'static str, value: String },
}

fn scramble(seq: u64) -> u64 {
    seq.wrapping_mul(SCRAMBLE_MUL) ^ SCRAMBLE_XOR
}

fn push_base62(out: &mut String, mut n: u64, width: usize) {
    let mut digits = [b'0'; 11];
    for slot in digits.iter_mut().rev() {
        *slot = BASE62[(n % 62) as usize];
        n /= 62;
    }
    // 62^11 > u64::MAX, so 11 digits always hold the value.
    for &d in &digits[digits.len() - width..] {
        out.push(char::from(d));
    }
}

/// Build the generated suffix for a sequence number.
#[must_use]
pub fn generated_suffix(seq: u64) -> String {
    let hi = scramble(seq);
    let lo = scramble(hi ^ seq.rotate_left(32));
    let mut out = String::with_capacity(GENERATED_SUFFIX_LEN);
    out.push_str("01");
    push_base62(&mut out, hi, 11);
    push_base62(&mut out, lo, 11);
    out
}

fn check(kind: &'static str, prefix: &'static str, value: &str) -> Result<(), IdError> {
    let Some(suffix) = value.strip_prefix(prefix) else {
        return Err(IdError::WrongPrefix {
            kind,
            prefix,
            value: value.to_string(),
        });
    };
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(IdError::BadSuffix {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Identifier prefix.
            pub const PREFIX: &'static str = $prefix;

            /// Parse and validate an identifier.
            pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                check($kind, $prefix, &value)?;
                Ok(Self(value))
            }

            /// Generate the identifier for a sequence number.
            #[must_use]
            pub fn from_sequence(seq: u64) -> Self {
                Self(format!("{}{}", $prefix, generated_suffix(seq)))
            }

            /// Borrow as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

prefixed_id!(
    /// Identifier of an organization invite (`invite_…`).
    InviteId,
    "invite",
    "invite_"
);

prefixed_id!(
    /// Identifier of a workspace (`wrkspc_…`).
    WorkspaceId,
    "workspace",
    "wrkspc_"
);

prefixed_id!(
    /// Identifier of a message batch (`msgbatch_…`).
    MessageBatchId,
    "message batch",
    "msgbatch_"
);

// =============================================================================
// TESTS
// =============================================================================
