//! # Registry Module
//!
//! Resource semantics of the contract, on top of [`RedbStore`].
//!
//! Every mutation runs in a single write transaction and receives the
//! current time from the caller. Plain reads of invites and workspaces use a
//! read-only snapshot; batch reads write because observing a batch may
//! settle it. Operations are grouped by resource:
//!
//! - `invites`: create, get, list, delete, accept
//! - `workspaces`: create, get, list, rename, archive
//! - `batches`: create, get, list, cancel, delete, results, sweep

mod batches;
mod invites;
mod workspaces;

use crate::storage::{RedbStore, StoreReader, StoreTxn};
use crate::Result;
use std::path::Path;

/// Base URL used in `results_url` when none is configured.
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8080";

/// The resource registry.
#[derive(Debug)]
pub struct Registry {
    store: RedbStore,
    public_url: String,
}

impl Registry {
    /// Wrap an opened store.
    #[must_use]
    pub fn new(store: RedbStore) -> Self {
        Self {
            store,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
        }
    }

    /// Open (or create) a registry database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(RedbStore::open(path)?))
    }

    /// A registry that lives only in memory.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(RedbStore::in_memory()?))
    }

    /// Set the externally visible base URL used for batch `results_url`s.
    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.public_url = url.trim_end_matches('/').to_string();
        self
    }

    /// The configured public base URL.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    fn transact<T>(&self, f: impl FnOnce(&StoreTxn<'_>) -> Result<T>) -> Result<T> {
        self.store.transact(f)
    }

    fn read<T>(&self, f: impl FnOnce(&StoreReader<'_>) -> Result<T>) -> Result<T> {
        self.store.read(f)
    }
}
