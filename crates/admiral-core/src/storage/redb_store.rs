//! redb-backed record store.
//!
//! Layout per collection:
//!
//! | Table | Key | Value |
//! |---|---|---|
//! | `<collection>` | id | postcard `(seq, record)` |
//! | `<collection>_order` | seq | id |
//! | `sequences` | collection name | last issued seq |
//!
//! The order table gives listings a stable creation order without decoding
//! every record to sort it.
//!
//! Lookups go through [`ReadRecords`], implemented by both the write
//! transaction of [`RedbStore::transact`] and the snapshot of
//! [`RedbStore::read`]. Reads never wait for the single writer.

use crate::{Error, Result};
use redb::backends::InMemoryBackend;
use redb::{
    Builder, Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

const INVITES: TableDefinition<&str, &[u8]> = TableDefinition::new("invites");
const INVITES_ORDER: TableDefinition<u64, &str> = TableDefinition::new("invites_order");
const WORKSPACES: TableDefinition<&str, &[u8]> = TableDefinition::new("workspaces");
const WORKSPACES_ORDER: TableDefinition<u64, &str> = TableDefinition::new("workspaces_order");
const BATCHES: TableDefinition<&str, &[u8]> = TableDefinition::new("batches");
const BATCHES_ORDER: TableDefinition<u64, &str> = TableDefinition::new("batches_order");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// A family of records sharing one id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Invites,
    Workspaces,
    Batches,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Collection; 3] = [Self::Invites, Self::Workspaces, Self::Batches];

    /// Name used as the sequence key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Invites => "invites",
            Self::Workspaces => "workspaces",
            Self::Batches => "batches",
        }
    }

    fn records(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            Self::Invites => INVITES,
            Self::Workspaces => WORKSPACES,
            Self::Batches => BATCHES,
        }
    }

    fn order(self) -> TableDefinition<'static, u64, &'static str> {
        match self {
            Self::Invites => INVITES_ORDER,
            Self::Workspaces => WORKSPACES_ORDER,
            Self::Batches => BATCHES_ORDER,
        }
    }
}

/// Persistent store for registry records.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish()
    }
}

impl RedbStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;
        Self::init(db)
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    /// Create every table so a fresh file has its full layout.
    fn init(db: Database) -> Result<Self> {
        let store = Self { db };
        store.transact(|tx| {
            for collection in Collection::ALL {
                tx.txn.open_table(collection.records())?;
                tx.txn.open_table(collection.order())?;
            }
            tx.txn.open_table(SEQUENCES)?;
            Ok(())
        })?;
        Ok(store)
    }

    /// Run `f` inside one write transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and is aborted
    /// otherwise, so a failed operation leaves no partial writes.
    pub fn transact<T>(&self, f: impl FnOnce(&StoreTxn<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_write()?;
        let outcome = f(&StoreTxn { txn: &txn });
        match outcome {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.abort()?;
                Err(err)
            }
        }
    }

    /// Run `f` against a read-only snapshot.
    ///
    /// Snapshots see the last committed state and do not block, or get
    /// blocked by, an open write transaction.
    pub fn read<T>(&self, f: impl FnOnce(&StoreReader<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_read()?;
        f(&StoreReader { txn: &txn })
    }
}

/// Record lookups shared by read-only and write transactions.
pub trait ReadRecords {
    /// Fetch a record together with its sequence number.
    fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<(u64, T)>>;

    /// Every record of a collection, in creation order.
    fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<(u64, T)>>;
}

fn get_record<T: DeserializeOwned>(
    records: &impl ReadableTable<&'static str, &'static [u8]>,
    id: &str,
) -> Result<Option<(u64, T)>> {
    let Some(guard) = records.get(id)? else {
        return Ok(None);
    };
    Ok(Some(postcard::from_bytes(guard.value())?))
}

fn list_records<T: DeserializeOwned>(
    order: &impl ReadableTable<u64, &'static str>,
    records: &impl ReadableTable<&'static str, &'static [u8]>,
) -> Result<Vec<(u64, T)>> {
    let mut out = Vec::new();
    for entry in order.iter()? {
        let (_, id) = entry?;
        if let Some(record) = get_record(records, id.value())? {
            out.push(record);
        }
    }
    Ok(out)
}

/// A read-only snapshot, handed out by [`RedbStore::read`].
pub struct StoreReader<'a> {
    txn: &'a ReadTransaction,
}

impl ReadRecords for StoreReader<'_> {
    fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<(u64, T)>> {
        get_record(&self.txn.open_table(collection.records())?, id)
    }

    fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<(u64, T)>> {
        let order = self.txn.open_table(collection.order())?;
        let records = self.txn.open_table(collection.records())?;
        list_records(&order, &records)
    }
}

/// Operations available inside [`RedbStore::transact`].
pub struct StoreTxn<'a> {
    txn: &'a WriteTransaction,
}

impl StoreTxn<'_> {
    /// Issue the next sequence number of a collection, starting at 1.
    pub fn next_sequence(&self, collection: Collection) -> Result<u64> {
        let mut table = self.txn.open_table(SEQUENCES)?;
        let current = table
            .get(collection.name())?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::Storage(format!("{} sequence exhausted", collection.name())))?;
        table.insert(collection.name(), next)?;
        Ok(next)
    }

    /// Insert or replace a record.
    ///
    /// `seq` must be the sequence the record was created with; it fixes the
    /// record's position in listings.
    pub fn put<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        seq: u64,
        record: &T,
    ) -> Result<()> {
        let bytes = postcard::to_allocvec(&(seq, record))?;
        let mut records = self.txn.open_table(collection.records())?;
        records.insert(id, bytes.as_slice())?;
        let mut order = self.txn.open_table(collection.order())?;
        order.insert(seq, id)?;
        Ok(())
    }

    /// Delete a record. Returns whether it existed.
    pub fn remove(&self, collection: Collection, id: &str) -> Result<bool> {
        let seq = {
            let mut records = self.txn.open_table(collection.records())?;
            let removed = records.remove(id)?;
            match removed {
                Some(guard) => {
                    let (seq, _) = postcard::take_from_bytes::<u64>(guard.value())?;
                    seq
                }
                None => return Ok(false),
            }
        };
        let mut order = self.txn.open_table(collection.order())?;
        order.remove(seq)?;
        Ok(true)
    }
}

impl ReadRecords for StoreTxn<'_> {
    fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<(u64, T)>> {
        get_record(&self.txn.open_table(collection.records())?, id)
    }

    fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<(u64, T)>> {
        let order = self.txn.open_table(collection.order())?;
        let records = self.txn.open_table(collection.records())?;
        list_records(&order, &records)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn sequences_start_at_one_and_are_per_collection() {
        let store = RedbStore::in_memory().unwrap();
        let (a, b, c) = store
            .transact(|tx| {
                Ok((
                    tx.next_sequence(Collection::Invites)?,
                    tx.next_sequence(Collection::Invites)?,
                    tx.next_sequence(Collection::Batches)?,
                ))
            })
            .unwrap();
        assert_eq!((a, b, c), (1, 2, 1));
    }

    #[test]
    fn put_get_list_remove() {
        let store = RedbStore::in_memory().unwrap();
        store
            .transact(|tx| {
                tx.put(Collection::Workspaces, "b", 2, &note("b", "second"))?;
                tx.put(Collection::Workspaces, "a", 1, &note("a", "first"))?;
                Ok(())
            })
            .unwrap();

        let listed: Vec<(u64, Note)> = store
            .transact(|tx| tx.list(Collection::Workspaces))
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|(_, n)| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let got: Option<(u64, Note)> = store
            .transact(|tx| tx.get(Collection::Workspaces, "b"))
            .unwrap();
        assert_eq!(got, Some((2, note("b", "second"))));

        assert!(store.transact(|tx| tx.remove(Collection::Workspaces, "a")).unwrap());
        assert!(!store.transact(|tx| tx.remove(Collection::Workspaces, "a")).unwrap());
        let listed: Vec<(u64, Note)> = store
            .transact(|tx| tx.list(Collection::Workspaces))
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn failed_transactions_roll_back() {
        let store = RedbStore::in_memory().unwrap();
        let result: Result<()> = store.transact(|tx| {
            tx.put(Collection::Invites, "x", 1, &note("x", "doomed"))?;
            Err(Error::invalid("abort"))
        });
        assert!(result.is_err());

        let got: Option<(u64, Note)> = store
            .transact(|tx| tx.get(Collection::Invites, "x"))
            .unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn snapshots_see_only_committed_records() {
        let store = RedbStore::in_memory().unwrap();
        store
            .transact(|tx| tx.put(Collection::Invites, "old", 1, &note("old", "committed")))
            .unwrap();

        store
            .transact(|tx| {
                tx.put(Collection::Invites, "new", 2, &note("new", "in flight"))?;
                let seen: Vec<(u64, Note)> = store.read(|r| r.list(Collection::Invites))?;
                assert_eq!(seen, vec![(1, note("old", "committed"))]);
                let missing: Option<(u64, Note)> =
                    store.read(|r| r.get(Collection::Invites, "new"))?;
                assert!(missing.is_none());
                Ok(())
            })
            .unwrap();

        let seen: Vec<(u64, Note)> = store.read(|r| r.list(Collection::Invites)).unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admiral.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store
                .transact(|tx| tx.put(Collection::Batches, "k", 7, &note("k", "kept")))
                .unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        let got: Option<(u64, Note)> = store
            .transact(|tx| tx.get(Collection::Batches, "k"))
            .unwrap();
        assert_eq!(got, Some((7, note("k", "kept"))));
    }
}
