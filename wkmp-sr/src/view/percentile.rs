//! Percentile tiering of the visible view
//!
//! `percentile = index / count` over the visible, rank-sorted view, so the top
//! record gets 0.0 and every value lies in `[0, 1)`. Hidden records keep
//! whatever they had last; the value is a display hint only.

use crate::models::ResultRecord;

/// Assign percentiles to `visible` slots (already sorted best-first).
/// Returns false and touches nothing when the view is empty.
pub fn assign_percentiles(records: &mut [ResultRecord], visible: &[usize]) -> bool {
    if visible.is_empty() {
        return false;
    }
    let count = visible.len() as f64;
    for (index, &slot) in visible.iter().enumerate() {
        records[slot].percentile = index as f64 / count;
    }
    true
}

/// Display tier for a percentile (1 = top 10%)
pub fn tier(percentile: f64) -> u8 {
    match percentile {
        p if p < 0.10 => 1,
        p if p < 0.35 => 2,
        p if p < 0.70 => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawCandidate, RecordId, TrackStatus};

    fn records(n: usize) -> Vec<ResultRecord> {
        (0..n)
            .map(|i| {
                ResultRecord::from_candidate(
                    RecordId(i as u64),
                    RawCandidate {
                        filename: "a.mp3".into(),
                        format: String::new(),
                        bitrate: 320,
                        queue_depth: 0,
                        file_size: 0,
                        peer_id: "p".into(),
                        source_hash: "h".into(),
                    },
                    TrackStatus::Missing,
                )
            })
            .collect()
    }

    #[test]
    fn test_monotonic_in_unit_interval() {
        let mut recs = records(4);
        let visible = [2, 0, 3, 1];
        assert!(assign_percentiles(&mut recs, &visible));
        let values: Vec<f64> = visible.iter().map(|&s| recs[s].percentile).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_hidden_records_keep_stale_value() {
        let mut recs = records(3);
        recs[1].percentile = 0.9;
        assign_percentiles(&mut recs, &[2, 0]);
        assert_eq!(recs[1].percentile, 0.9);
        assert_eq!(recs[2].percentile, 0.0);
        assert_eq!(recs[0].percentile, 0.5);
    }

    #[test]
    fn test_empty_view_is_noop() {
        let mut recs = records(2);
        recs[0].percentile = 0.42;
        assert!(!assign_percentiles(&mut recs, &[]));
        assert_eq!(recs[0].percentile, 0.42);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(tier(0.0), 1);
        assert_eq!(tier(0.2), 2);
        assert_eq!(tier(0.5), 3);
        assert_eq!(tier(0.99), 4);
    }
}
