//! Sorted index of records that pass the active predicate
//!
//! Ordering is rank descending, ties broken by insertion order (slot), so the
//! view is deterministic for equal ranks. Incoming batches are merged in
//! without re-sorting what is already there.

use std::cmp::Ordering;

use crate::filter::Predicate;
use crate::models::ResultRecord;

/// Best-first ordering of two slots
fn by_rank(records: &[ResultRecord], a: usize, b: usize) -> Ordering {
    records[b]
        .rank
        .total_cmp(&records[a].rank)
        .then_with(|| a.cmp(&b))
}

#[derive(Debug, Clone)]
pub struct RankedView {
    predicate: Predicate,
    visible: Vec<usize>,
    hidden: usize,
}

impl Default for RankedView {
    fn default() -> Self {
        Self::new(Predicate::default())
    }
}

impl RankedView {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            visible: Vec::new(),
            hidden: 0,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Visible slots, best first
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden
    }

    pub fn clear(&mut self) {
        self.visible.clear();
        self.hidden = 0;
    }

    /// Merge newly appended slots into the view
    pub fn merge_new(&mut self, records: &[ResultRecord], new_slots: impl IntoIterator<Item = usize>) {
        let mut incoming: Vec<usize> = new_slots
            .into_iter()
            .filter(|&slot| self.predicate.matches(&records[slot]))
            .collect();
        if !incoming.is_empty() {
            incoming.sort_by(|&a, &b| by_rank(records, a, b));

            let existing = std::mem::take(&mut self.visible);
            let mut merged = Vec::with_capacity(existing.len() + incoming.len());
            let (mut i, mut j) = (0, 0);
            while i < existing.len() && j < incoming.len() {
                if by_rank(records, existing[i], incoming[j]) != Ordering::Greater {
                    merged.push(existing[i]);
                    i += 1;
                } else {
                    merged.push(incoming[j]);
                    j += 1;
                }
            }
            merged.extend_from_slice(&existing[i..]);
            merged.extend_from_slice(&incoming[j..]);
            self.visible = merged;
        }
        self.hidden = records.len() - self.visible.len();
    }

    /// Re-place one slot whose rank (or filter-relevant fields) changed
    pub fn refresh(&mut self, records: &[ResultRecord], slot: usize) {
        if let Some(pos) = self.visible.iter().position(|&s| s == slot) {
            self.visible.remove(pos);
        }
        if self.predicate.matches(&records[slot]) {
            let at = self
                .visible
                .partition_point(|&s| by_rank(records, s, slot) == Ordering::Less);
            self.visible.insert(at, slot);
        }
        self.hidden = records.len() - self.visible.len();
    }

    /// Re-sort after every rank changed (membership is unchanged)
    pub fn resort(&mut self, records: &[ResultRecord]) {
        self.visible.sort_by(|&a, &b| by_rank(records, a, b));
    }

    /// Swap in a new predicate and recompute membership from scratch
    pub fn set_predicate(&mut self, predicate: Predicate, records: &[ResultRecord]) {
        self.predicate = predicate;
        self.rebuild(records);
    }

    pub fn rebuild(&mut self, records: &[ResultRecord]) {
        self.visible = (0..records.len())
            .filter(|&slot| self.predicate.matches(&records[slot]))
            .collect();
        self.resort(records);
        self.hidden = records.len() - self.visible.len();
    }
}
