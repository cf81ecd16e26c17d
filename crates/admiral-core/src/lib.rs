//! # Admiral Core
//!
//! Typed model of the organization admin and message-batch HTTP contract.
//!
//! This crate contains:
//! - Prefixed identifiers (`invite_…`, `wrkspc_…`, `msgbatch_…`)
//! - Microsecond RFC 3339 timestamps
//! - Wire resources, request bodies and list pages
//! - The error envelope and its status mapping
//! - Header parsing (`anthropic-version`, `anthropic-beta`, `x-api-key`)
//! - Strict schema-conformance checks for raw JSON responses
//! - The persistent registry (feature `store`)
//!
//! ## Example
//!
//! ```rust
//! use admiral_core::{InviteId, Timestamp};
//!
//! let id = InviteId::parse("invite_015gWxCN9Hfg2QhZwTK7Mdeu").unwrap();
//! assert_eq!(id.as_str(), "invite_015gWxCN9Hfg2QhZwTK7Mdeu");
//!
//! let ts = Timestamp::parse("2024-10-30T23:58:27.427722Z").unwrap();
//! assert_eq!(ts.to_string(), "2024-10-30T23:58:27.427722Z");
//! ```
//!
//! ## Determinism
//!
//! Nothing in this crate reads the wall clock on its own. Every registry
//! operation receives `now` from the caller, and generated identifiers are a
//! pure function of a stored sequence number.

pub mod conformance;
pub mod error;
pub mod headers;
pub mod ids;
pub mod models;
pub mod time;
pub mod validate;

#[cfg(feature = "store")]
pub mod registry;
#[cfg(feature = "store")]
pub mod storage;

pub use error::{Error, ErrorDetail, ErrorEnvelope, ErrorKind, Result};
pub use ids::{IdError, InviteId, MessageBatchId, WorkspaceId};
pub use models::*;
pub use time::Timestamp;

#[cfg(feature = "store")]
pub use registry::Registry;
#[cfg(feature = "store")]
pub use storage::RedbStore;
