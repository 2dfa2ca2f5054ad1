//! Scoring engine
//!
//! Rank is a weighted sum of normalized sub-scores plus additive bonuses from
//! per-search preferred conditions:
//!
//! ```text
//! rank = wq*quality + wa*availability + wm*musical + wd*metadata + ws*string
//!      + sum(condition.boost(record))
//! ```
//!
//! Sub-score extraction is delegated to a [`FeatureScorer`]; the engine only
//! orchestrates and weights.

pub mod conditions;
pub mod engine;
pub mod features;

pub use conditions::{BitrateRangeCondition, ConditionEvaluator, PreferredFormatCondition};
pub use engine::ScoringEngine;
pub use features::{DefaultFeatureScorer, FeatureScorer, SubScores};
