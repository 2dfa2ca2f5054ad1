//! Arena of result records for the current session
//!
//! Records are only ever appended or discarded all at once, so a record's
//! slot is `id - base` and lookups by id are O(1). A hash index maps each
//! source-track hash to every slot carrying it.

use std::collections::HashMap;

use crate::models::{RawCandidate, RecordId, ResultRecord, TrackStatus};

#[derive(Debug, Default)]
pub struct LiveCollection {
    /// Id of the record in slot 0
    base: u64,
    next_id: u64,
    records: Vec<ResultRecord>,
    by_hash: HashMap<String, Vec<usize>>,
}

impl LiveCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a candidate; returns its slot
    pub fn push(&mut self, candidate: RawCandidate, status: TrackStatus) -> usize {
        let slot = self.records.len();
        let record = ResultRecord::from_candidate(RecordId(self.next_id), candidate, status);
        self.next_id += 1;
        self.by_hash
            .entry(record.source_hash.clone())
            .or_default()
            .push(slot);
        self.records.push(record);
        slot
    }

    /// Discard every record. Ids keep increasing so stale ids never resolve.
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_hash.clear();
        self.base = self.next_id;
    }

    pub fn slot_of(&self, id: RecordId) -> Option<usize> {
        let slot = id.0.checked_sub(self.base)? as usize;
        (slot < self.records.len()).then_some(slot)
    }

    pub fn get(&self, id: RecordId) -> Option<&ResultRecord> {
        self.slot_of(id).map(|slot| &self.records[slot])
    }

    /// Slots of every record sharing `hash`
    pub fn slots_for_hash(&self, hash: &str) -> &[usize] {
        self.by_hash.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ResultRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
