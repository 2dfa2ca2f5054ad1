//! Rank orchestration

use std::sync::Arc;
use tracing::warn;

use super::conditions::ConditionEvaluator;
use super::features::{DefaultFeatureScorer, FeatureScorer, SubScores};
use crate::models::{RankingContext, ResultRecord, WeightVector};

/// Combines sub-scores, weights and condition boosts into a rank
#[derive(Clone)]
pub struct ScoringEngine {
    scorer: Arc<dyn FeatureScorer>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(Arc::new(DefaultFeatureScorer::default()))
    }
}

impl ScoringEngine {
    pub fn new(scorer: Arc<dyn FeatureScorer>) -> Self {
        Self { scorer }
    }

    /// Deterministic rank of `record`. Non-finite results collapse to 0.0.
    pub fn rank(
        &self,
        record: &ResultRecord,
        context: &RankingContext,
        weights: &WeightVector,
        conditions: &[Arc<dyn ConditionEvaluator>],
    ) -> f64 {
        let scores = self.scorer.score(record, context);
        let rank = weighted_sum(&scores, weights)
            + conditions.iter().map(|c| c.boost(record)).sum::<f64>();

        if rank.is_finite() {
            rank
        } else {
            warn!(record = %record.id, scorer = self.scorer.name(), "Non-finite rank, using 0.0");
            0.0
        }
    }

    /// Compute and store the rank on the record
    pub fn score_into(
        &self,
        record: &mut ResultRecord,
        context: &RankingContext,
        weights: &WeightVector,
        conditions: &[Arc<dyn ConditionEvaluator>],
    ) {
        record.rank = self.rank(record, context, weights, conditions);
    }
}

fn weighted_sum(s: &SubScores, w: &WeightVector) -> f64 {
    s.quality * w.quality
        + s.availability * w.availability
        + s.musical * w.musical
        + s.metadata * w.metadata
        + s.string * w.string
}
