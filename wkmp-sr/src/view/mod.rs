//! Reactive result view
//!
//! [`ResultView`] owns the live collection and the ranked index over it and
//! keeps the two consistent: after every mutation the visible sequence holds
//! exactly the records that pass the active predicate, sorted best-first, and
//! `hidden_count() == len() - visible_len()`.

pub mod live_collection;
pub mod percentile;
pub mod ranked_view;

pub use live_collection::LiveCollection;
pub use percentile::{assign_percentiles, tier};
pub use ranked_view::RankedView;

use crate::filter::Predicate;
use crate::models::{RawCandidate, RecordId, ResultRecord, TrackStatus};

#[derive(Debug, Default)]
pub struct ResultView {
    live: LiveCollection,
    ranked: RankedView,
}

impl ResultView {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            live: LiveCollection::new(),
            ranked: RankedView::new(predicate),
        }
    }

    /// Append a batch. `score` assigns each new record its rank before the
    /// batch is merged into the visible index.
    pub fn extend<I, F>(&mut self, batch: I, mut score: F) -> usize
    where
        I: IntoIterator<Item = (RawCandidate, TrackStatus)>,
        F: FnMut(&mut ResultRecord),
    {
        let start = self.live.len();
        for (candidate, status) in batch {
            let slot = self.live.push(candidate, status);
            score(&mut self.live.records_mut()[slot]);
        }
        let end = self.live.len();
        self.ranked.merge_new(self.live.records(), start..end);
        end - start
    }

    /// Rescore every record in place, then re-sort
    pub fn rescore<F>(&mut self, mut score: F)
    where
        F: FnMut(&mut ResultRecord),
    {
        for record in self.live.records_mut() {
            score(record);
        }
        self.ranked.resort(self.live.records());
    }

    /// Mutate one record in place (fields and rank), then reposition only
    /// that record. Returns false for an unknown id.
    pub fn update_record<F>(&mut self, id: RecordId, update: F) -> bool
    where
        F: FnOnce(&mut ResultRecord),
    {
        let Some(slot) = self.live.slot_of(id) else {
            return false;
        };
        update(&mut self.live.records_mut()[slot]);
        self.ranked.refresh(self.live.records(), slot);
        true
    }

    pub fn set_predicate(&mut self, predicate: Predicate) {
        self.ranked.set_predicate(predicate, self.live.records());
    }

    pub fn predicate(&self) -> &Predicate {
        self.ranked.predicate()
    }

    /// Apply a status to every record sharing `hash`; returns how many changed
    pub fn set_status_for_hash(&mut self, hash: &str, status: TrackStatus) -> usize {
        let slots = self.live.slots_for_hash(hash).to_vec();
        let records = self.live.records_mut();
        let mut changed = 0;
        for slot in slots {
            if records[slot].status != status {
                records[slot].status = status;
                changed += 1;
            }
        }
        changed
    }

    /// Recompute percentiles over the visible view; no-op when it is empty
    pub fn recompute_percentiles(&mut self) -> bool {
        let visible = self.ranked.visible().to_vec();
        assign_percentiles(self.live.records_mut(), &visible)
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.ranked.clear();
    }

    pub fn get(&self, id: RecordId) -> Option<&ResultRecord> {
        self.live.get(id)
    }

    /// Visible records, best first
    pub fn visible(&self) -> impl Iterator<Item = &ResultRecord> + '_ {
        let records = self.live.records();
        self.ranked.visible().iter().map(move |&slot| &records[slot])
    }

    /// Every record regardless of the predicate, in arrival order
    pub fn all(&self) -> &[ResultRecord] {
        self.live.records()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn visible_len(&self) -> usize {
        self.ranked.visible().len()
    }

    pub fn hidden_count(&self) -> usize {
        self.ranked.hidden_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterState;

    fn candidate(hash: &str, bitrate: u32) -> (RawCandidate, TrackStatus) {
        (
            RawCandidate {
                filename: format!("Music\\{}.mp3", hash),
                format: String::new(),
                bitrate,
                queue_depth: 0,
                file_size: 0,
                peer_id: "peer".into(),
                source_hash: hash.into(),
            },
            TrackStatus::Missing,
        )
    }

    fn assert_consistent(view: &ResultView) {
        let visible: Vec<&ResultRecord> = view.visible().collect();
        assert!(visible.iter().all(|r| view.predicate().matches(r)));
        assert!(visible.windows(2).all(|w| w[0].rank >= w[1].rank));
        assert_eq!(view.hidden_count(), view.len() - view.visible_len());
    }

    #[test]
    fn test_extend_scores_and_filters() {
        let predicate = Predicate::compile(&FilterState {
            min_bitrate: 192,
            ..Default::default()
        });
        let mut view = ResultView::new(predicate);
        let added = view.extend(
            vec![candidate("a", 128), candidate("b", 320), candidate("c", 256)],
            |r| r.rank = r.bitrate as f64,
        );
        assert_eq!(added, 3);
        let order: Vec<&str> = view.visible().map(|r| r.source_hash.as_str()).collect();
        assert_eq!(order, vec!["b", "c"]);
        assert_eq!(view.hidden_count(), 1);
        assert_consistent(&view);
    }

    #[test]
    fn test_rescore_reorders_without_new_records() {
        let mut view = ResultView::default();
        view.extend(vec![candidate("a", 128), candidate("b", 320)], |r| {
            r.rank = r.bitrate as f64
        });
        view.rescore(|r| r.rank = -(r.bitrate as f64));
        let order: Vec<&str> = view.visible().map(|r| r.source_hash.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(view.len(), 2);
        assert_consistent(&view);
    }

    #[test]
    fn test_update_record_and_status_by_hash() {
        let mut view = ResultView::default();
        view.extend(
            vec![candidate("x", 320), candidate("y", 320), candidate("x", 128)],
            |r| r.rank = 1.0,
        );
        let last = view.all()[2].id;
        assert!(view.update_record(last, |r| r.rank = 5.0));
        assert_eq!(view.visible().next().map(|r| r.id), Some(last));

        assert_eq!(view.set_status_for_hash("x", TrackStatus::Downloaded), 2);
        assert_eq!(view.set_status_for_hash("x", TrackStatus::Downloaded), 0);
        assert_eq!(view.all()[1].status, TrackStatus::Missing);
        assert_consistent(&view);
    }

    #[test]
    fn test_update_record_can_change_visibility() {
        let predicate = Predicate::compile(&FilterState {
            reliability_guard: true,
            queue_ceiling: 5,
            ..Default::default()
        });
        let mut view = ResultView::new(predicate);
        view.extend(vec![candidate("a", 320), candidate("b", 256)], |r| {
            r.rank = r.bitrate as f64
        });
        let a = view.all()[0].id;

        assert!(view.update_record(a, |r| r.queue_depth = 9));
        assert_eq!(view.visible_len(), 1);
        assert_eq!(view.hidden_count(), 1);
        assert_consistent(&view);

        assert!(view.update_record(a, |r| r.queue_depth = 0));
        let order: Vec<&str> = view.visible().map(|r| r.source_hash.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_consistent(&view);
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut view = ResultView::default();
        view.extend(vec![candidate("a", 320)], |r| r.rank = 1.0);
        let old = view.all()[0].id;
        view.clear();
        assert!(view.is_empty());
        assert_eq!(view.hidden_count(), 0);
        assert!(view.get(old).is_none());
        assert!(!view.update_record(old, |r| r.rank = 2.0));
    }
}
