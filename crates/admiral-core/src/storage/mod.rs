//! # Storage Module
//!
//! Durable record storage for the registry, using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (each registry mutation is one write transaction)
//! - MVCC snapshots, so plain reads never queue behind the writer
//! - Crash safety (copy-on-write B-trees)
//! - An in-memory backend for tests and ephemeral servers
//!
//! Records are encoded with postcard.

mod redb_store;

pub use redb_store::{Collection, ReadRecords, RedbStore, StoreReader, StoreTxn};

use crate::Error;

macro_rules! storage_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Error::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Error::Codec(err.to_string())
    }
}
