//! Donor store with a single-batch transaction boundary
//!
//! This module provides the `DonorStore`, the current-state registry of
//! donors keyed by external code. It is the persistence seam of the engine:
//! point lookups and full scans run lock-free on a concurrent map, while all
//! mutations flow through a staged [`DonorTransaction`] so that one batch's
//! accepted commands land together at commit or not at all.
//!
//! # Concurrency
//!
//! Batch transactions serialize on a store-level gate; handlers for
//! different files may run concurrently and simply queue here. This gate
//! plus the timestamp compare rule in the ordering engine is the entire
//! cross-batch concurrency story: a batch that loses the race reads the
//! winner's committed timestamps and has its stale commands rejected, never
//! blocked or retried internally.
//!
//! # Internal ids
//!
//! Internal donor ids are minted from a monotonic counter. Ids minted inside
//! a transaction that later aborts are abandoned, never reused, so a
//! committed id is unique for all time even across delete-and-recreate.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::types::{DonorRecord, InternalDonorId};

/// Current-state registry of donors keyed by external code
#[derive(Debug)]
pub struct DonorStore {
    /// Map of external donor code to current record
    donors: DashMap<String, DonorRecord>,

    /// Source of internal ids; the next id to mint
    next_internal_id: AtomicU64,

    /// Serializes batch transactions
    transaction_gate: Mutex<()>,
}

/// Staged write buffered inside a transaction
#[derive(Debug, Clone)]
enum StagedWrite {
    Put(DonorRecord),
    Remove(String),
}

/// One batch's atomic unit of work against the store
///
/// Reads see the store state overlaid with this transaction's staged writes,
/// so commands later in a batch observe the effects of earlier ones. Staged
/// writes land on [`commit`](DonorTransaction::commit); dropping the
/// transaction without committing abandons them.
#[derive(Debug)]
pub struct DonorTransaction<'a> {
    store: &'a DonorStore,
    _gate: MutexGuard<'a, ()>,
    staged: Vec<StagedWrite>,
}

impl DonorStore {
    /// Create an empty store; internal ids start at 1
    pub fn new() -> Self {
        DonorStore {
            donors: DashMap::new(),
            next_internal_id: AtomicU64::new(1),
            transaction_gate: Mutex::new(()),
        }
    }

    /// Begin a batch transaction, waiting for any in-flight batch to finish
    pub fn begin(&self) -> DonorTransaction<'_> {
        // The gate guards no data of its own, so a poisoned lock (a panic in
        // another handler) leaves nothing to repair.
        let gate = self
            .transaction_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        DonorTransaction {
            store: self,
            _gate: gate,
            staged: Vec::new(),
        }
    }

    /// Point lookup of a donor by external code
    pub fn get(&self, external_code: &str) -> Option<DonorRecord> {
        self.donors
            .get(external_code)
            .map(|entry| entry.value().clone())
    }

    /// Full scan for reconciliation, sorted by external code
    pub fn all(&self) -> Vec<DonorRecord> {
        let mut records: Vec<DonorRecord> = self
            .donors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.external_code.cmp(&b.external_code));
        records
    }

    /// Number of registered donors
    pub fn len(&self) -> usize {
        self.donors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.donors.is_empty()
    }

    fn mint_internal_id(&self) -> InternalDonorId {
        self.next_internal_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for DonorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DonorTransaction<'_> {
    /// Read a donor through this transaction's staged overlay
    ///
    /// The most recent staged write for the code wins; otherwise the
    /// committed store state is returned.
    pub fn get(&self, external_code: &str) -> Option<DonorRecord> {
        for write in self.staged.iter().rev() {
            match write {
                StagedWrite::Put(record) if record.external_code == external_code => {
                    return Some(record.clone());
                }
                StagedWrite::Remove(code) if code == external_code => return None,
                _ => {}
            }
        }
        self.store.get(external_code)
    }

    /// Mint a fresh internal id
    ///
    /// Monotonic across the store's lifetime. If this transaction aborts the
    /// id is abandoned, leaving a gap rather than ever reusing it.
    pub fn mint_internal_id(&self) -> InternalDonorId {
        self.store.mint_internal_id()
    }

    /// Stage an insert-or-replace of a donor record
    pub fn put(&mut self, record: DonorRecord) {
        self.staged.push(StagedWrite::Put(record));
    }

    /// Stage the removal of a donor record
    pub fn remove(&mut self, external_code: &str) {
        self.staged
            .push(StagedWrite::Remove(external_code.to_string()));
    }

    /// Number of staged writes
    pub fn staged_writes(&self) -> usize {
        self.staged.len()
    }

    /// Apply all staged writes to the store
    pub fn commit(self) {
        for write in self.staged {
            match write {
                StagedWrite::Put(record) => {
                    self.store.donors.insert(record.external_code.clone(), record);
                }
                StagedWrite::Remove(code) => {
                    self.store.donors.remove(&code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HlaPayload, Locus};
    use chrono::{TimeZone, Utc};

    fn record(store: &DonorStore, code: &str) -> DonorRecord {
        DonorRecord {
            internal_id: store.begin().mint_internal_id(),
            external_code: code.to_string(),
            hla: HlaPayload::new().with_typing(Locus::A, "*01:01", "*02:01"),
            last_applied_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            source_file_location: "registry/seed.json".to_string(),
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = DonorStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_committed_put_is_visible() {
        let store = DonorStore::new();
        let donor = record(&store, "D0001");

        let mut txn = store.begin();
        txn.put(donor.clone());
        txn.commit();

        assert_eq!(store.get("D0001"), Some(donor));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dropped_transaction_commits_nothing() {
        let store = DonorStore::new();
        let donor = record(&store, "D0001");

        {
            let mut txn = store.begin();
            txn.put(donor);
            assert_eq!(txn.staged_writes(), 1);
            // dropped without commit
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_transaction_reads_its_own_staged_writes() {
        let store = DonorStore::new();
        let donor = record(&store, "D0001");

        let mut txn = store.begin();
        assert!(txn.get("D0001").is_none());

        txn.put(donor.clone());
        assert_eq!(txn.get("D0001"), Some(donor));

        txn.remove("D0001");
        assert!(txn.get("D0001").is_none());
    }

    #[test]
    fn test_latest_staged_write_wins_within_a_transaction() {
        let store = DonorStore::new();
        let first = record(&store, "D0001");
        let mut second = record(&store, "D0001");
        second.hla = HlaPayload::new().with_typing(Locus::B, "*07:02", "*08:01");

        let mut txn = store.begin();
        txn.put(first);
        txn.put(second.clone());

        assert_eq!(txn.get("D0001"), Some(second.clone()));
        txn.commit();
        assert_eq!(store.get("D0001"), Some(second));
    }

    #[test]
    fn test_commit_applies_writes_in_order() {
        let store = DonorStore::new();
        let donor = record(&store, "D0001");

        let mut txn = store.begin();
        txn.put(donor);
        txn.remove("D0001");
        txn.commit();

        assert!(store.get("D0001").is_none());
    }

    #[test]
    fn test_internal_ids_are_monotonic_and_survive_aborts() {
        let store = DonorStore::new();

        let first = store.begin().mint_internal_id();

        // Abort a transaction after minting; the id must not come back.
        {
            let txn = store.begin();
            let abandoned = txn.mint_internal_id();
            assert!(abandoned > first);
        }

        let next = store.begin().mint_internal_id();
        assert!(next > first + 1, "abandoned id was reused");
    }

    #[test]
    fn test_all_is_sorted_by_external_code() {
        let store = DonorStore::new();
        let mut txn = store.begin();
        for code in ["D0003", "D0001", "D0002"] {
            txn.put(DonorRecord {
                internal_id: txn.mint_internal_id(),
                external_code: code.to_string(),
                hla: HlaPayload::new(),
                last_applied_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                source_file_location: "registry/seed.json".to_string(),
            });
        }
        txn.commit();

        let codes: Vec<String> = store
            .all()
            .into_iter()
            .map(|record| record.external_code)
            .collect();
        assert_eq!(codes, vec!["D0001", "D0002", "D0003"]);
    }

    #[test]
    fn test_concurrent_point_reads_do_not_block_on_the_gate() {
        let store = DonorStore::new();
        let donor = record(&store, "D0001");
        let mut txn = store.begin();
        txn.put(donor.clone());
        txn.commit();

        // Hold the gate open and read from outside the transaction.
        let _txn = store.begin();
        assert_eq!(store.get("D0001"), Some(donor));
    }
}
