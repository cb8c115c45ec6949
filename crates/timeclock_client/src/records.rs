//! The local record cache and its reconciliation with the server.
//!
//! Records are kept newest first. The clock status is never stored on its
//! own in memory: it is recomputed from the head of the sequence by
//! [`ClockStatus::from_records`], so the two cannot diverge.

use parking_lot::RwLock;
use std::sync::Arc;
use timeclock_protocol::{
    now_millis, ClockAction, ClockRecord, ClockStatus, Location, RecordId, SyncState,
    MILLIS_PER_HOUR,
};
use timeclock_storage::{get_json, keys, set_json, KeyValueStore, StorageError, StorageResult};
use tracing::{debug, warn};

/// An optimistic record together with the status it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    record: ClockRecord,
    prior_status: ClockStatus,
}

impl PendingWrite {
    /// The record inserted at the head of the sequence.
    pub fn record(&self) -> &ClockRecord {
        &self.record
    }

    /// Status immediately before the write.
    pub fn prior_status(&self) -> ClockStatus {
        self.prior_status
    }
}

/// Owns the ordered clock record sequence.
pub struct RecordStore {
    records: RwLock<Vec<ClockRecord>>,
    store: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    /// Creates an empty record store persisting to `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Restores the cached sequence. Needs no network.
    ///
    /// Records persisted as pending belong to a write whose outcome is
    /// unknown and are marked failed. A persisted status that disagrees
    /// with the sequence head is logged and ignored.
    pub fn load(&self) -> StorageResult<Vec<ClockRecord>> {
        let mut records: Vec<ClockRecord> = match get_json(self.store.as_ref(), keys::CLOCK_RECORDS) {
            Ok(records) => records.unwrap_or_default(),
            Err(StorageError::Corrupted { key, message }) => {
                warn!(%key, %message, "discarding corrupted record cache");
                self.store.delete(&key)?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        for record in records.iter_mut().filter(|r| r.sync_state == SyncState::Pending) {
            warn!(id = %record.id, "record was still pending at shutdown, marking failed");
            record.sync_state = SyncState::Failed;
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let derived = ClockStatus::from_records(&records);
        match get_json::<ClockStatus>(self.store.as_ref(), keys::CURRENT_STATUS) {
            Ok(Some(cached)) if cached != derived => {
                warn!(cached = %cached, derived = %derived, "cached status disagrees with records, using records");
            }
            Err(e) => warn!(error = %e, "ignoring unreadable cached status"),
            _ => {}
        }

        debug!(count = records.len(), status = %derived, "record cache loaded");
        *self.records.write() = records.clone();
        Ok(records)
    }

    /// Current clock status, derived from the sequence head.
    pub fn status(&self) -> ClockStatus {
        ClockStatus::from_records(&self.records.read())
    }

    /// Returns a copy of the sequence, newest first.
    pub fn records(&self) -> Vec<ClockRecord> {
        self.records.read().clone()
    }

    /// Returns the newest record.
    pub fn head(&self) -> Option<ClockRecord> {
        self.records.read().first().cloned()
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are cached.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &RecordId) -> Option<ClockRecord> {
        self.records.read().iter().find(|r| &r.id == id).cloned()
    }

    /// Inserts a pending record stamped with the current time.
    pub fn begin_optimistic_write(
        &self,
        action: ClockAction,
        location: Option<Location>,
        user_id: &str,
    ) -> PendingWrite {
        self.begin_optimistic_write_at(action, location, user_id, now_millis())
    }

    /// Inserts a pending record at the head of the sequence.
    ///
    /// The derived status flips as soon as this returns.
    pub fn begin_optimistic_write_at(
        &self,
        action: ClockAction,
        location: Option<Location>,
        user_id: &str,
        timestamp: i64,
    ) -> PendingWrite {
        let mut records = self.records.write();
        let prior_status = ClockStatus::from_records(&records);
        let record = ClockRecord::pending(action, timestamp, location, user_id);
        records.insert(0, record.clone());
        debug!(id = %record.id, action = %action, "optimistic write");
        PendingWrite {
            record,
            prior_status,
        }
    }

    /// Marks the pending record confirmed under `server_id`.
    ///
    /// Returns `None` if the record is gone (rolled back or cleared).
    pub fn confirm(&self, pending: &PendingWrite, server_id: impl Into<String>) -> Option<ClockRecord> {
        let mut records = self.records.write();
        let record = records.iter_mut().find(|r| r.id == pending.record.id)?;
        record.id = RecordId::Server(server_id.into());
        record.sync_state = SyncState::Confirmed;
        Some(record.clone())
    }

    /// Removes the pending record, undoing [`Self::begin_optimistic_write`].
    ///
    /// Returns false if the record was already gone.
    pub fn rollback(&self, pending: &PendingWrite) -> bool {
        let mut records = self.records.write();
        let Some(index) = records.iter().position(|r| r.id == pending.record.id) else {
            return false;
        };
        records.remove(index);

        let restored = ClockStatus::from_records(&records);
        if restored != pending.prior_status {
            warn!(
                expected = %pending.prior_status,
                actual = %restored,
                "status after rollback differs from status before the write"
            );
        }
        true
    }

    /// Empties the sequence and removes the persisted cache.
    pub fn clear(&self) -> StorageResult<()> {
        self.records.write().clear();
        self.store.delete(keys::CLOCK_RECORDS)?;
        self.store.delete(keys::CURRENT_STATUS)
    }

    /// Writes the sequence and the derived status.
    pub fn persist(&self) -> StorageResult<()> {
        let records = self.records.read().clone();
        set_json(self.store.as_ref(), keys::CLOCK_RECORDS, &records)?;
        set_json(
            self.store.as_ref(),
            keys::CURRENT_STATUS,
            &ClockStatus::from_records(&records),
        )
    }

    /// Replaces cached records with the server's list.
    ///
    /// Local pending records stay at the head; failed and previously
    /// confirmed records are dropped. Returns the number of server records.
    pub fn reconcile(&self, server_records: Vec<ClockRecord>) -> usize {
        let mut server_records = server_records;
        for record in &mut server_records {
            record.sync_state = SyncState::Confirmed;
        }
        server_records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let count = server_records.len();

        let mut records = self.records.write();
        let mut merged: Vec<ClockRecord> = records
            .iter()
            .filter(|r| r.sync_state == SyncState::Pending)
            .cloned()
            .collect();
        merged.extend(server_records);
        *records = merged;

        debug!(count, "reconciled with server records");
        count
    }

    /// Replaces the cached record with the same id. Returns false if absent.
    pub fn apply_update(&self, updated: ClockRecord) -> bool {
        let mut records = self.records.write();
        let Some(slot) = records.iter_mut().find(|r| r.id == updated.id) else {
            return false;
        };
        *slot = updated;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        true
    }

    /// Removes a record by id. Returns false if absent.
    pub fn remove(&self, id: &RecordId) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| &r.id != id);
        records.len() != before
    }

    /// Hours worked across the whole cached sequence.
    pub fn worked_hours(&self) -> f64 {
        let mut chronological = self.records();
        chronological.reverse();
        compute_worked_hours(&chronological)
    }

    /// Hours worked on one calendar date (`YYYY-MM-DD`).
    pub fn worked_hours_on(&self, date: &str) -> f64 {
        let chronological: Vec<ClockRecord> = self
            .records
            .read()
            .iter()
            .rev()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        compute_worked_hours(&chronological)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("len", &self.len())
            .field("status", &self.status())
            .finish()
    }
}

/// Sums `clock_out - clock_in` over oldest-first records, in hours.
///
/// Records are paired by position, two at a time from the oldest. A pair
/// counts only if it is exactly `(clock_in, clock_out)`; anything else is
/// skipped, as is an unpaired trailing record. Failed records are ignored.
/// A pair whose clock-out precedes its clock-in, or whose span does not fit
/// in an `i64`, is skipped too. The result is rounded to two decimals.
pub fn compute_worked_hours(chronological: &[ClockRecord]) -> f64 {
    let counted: Vec<&ClockRecord> = chronological
        .iter()
        .filter(|r| r.sync_state != SyncState::Failed)
        .collect();

    let millis = counted
        .chunks_exact(2)
        .filter(|pair| pair[0].action == ClockAction::ClockIn && pair[1].action == ClockAction::ClockOut)
        .filter_map(|pair| pair[1].timestamp.checked_sub(pair[0].timestamp))
        .filter(|span| *span >= 0)
        .fold(0_i64, i64::saturating_add);

    let hours = millis as f64 / MILLIS_PER_HOUR as f64;
    (hours * 100.0).round() / 100.0
}
