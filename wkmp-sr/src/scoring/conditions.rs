//! Preferred-condition evaluators
//!
//! Conditions are supplied per search (from the search request and the active
//! filter), never hard-coded into the engine. Each contributes an additive
//! boost when a record satisfies it.

use std::collections::BTreeSet;

use crate::models::{normalize_format, ResultRecord};

/// A pluggable preferred criterion
pub trait ConditionEvaluator: Send + Sync + std::fmt::Debug {
    /// Condition name for diagnostics
    fn name(&self) -> &str;

    /// Additive rank contribution for `record` (0.0 when not satisfied)
    fn boost(&self, record: &ResultRecord) -> f64;
}

/// Boost records whose nominal bitrate is within `[min, max]`
#[derive(Debug, Clone)]
pub struct BitrateRangeCondition {
    pub min: u32,
    pub max: u32,
    pub boost: f64,
}

impl ConditionEvaluator for BitrateRangeCondition {
    fn name(&self) -> &str {
        "bitrate_in_range"
    }

    fn boost(&self, record: &ResultRecord) -> f64 {
        if (self.min..=self.max).contains(&record.bitrate) {
            self.boost
        } else {
            0.0
        }
    }
}

/// Boost records whose format is in a preferred set
#[derive(Debug, Clone)]
pub struct PreferredFormatCondition {
    formats: BTreeSet<String>,
    boost: f64,
}

impl PreferredFormatCondition {
    pub fn new<I, S>(formats: I, boost: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            formats: formats.into_iter().map(|f| normalize_format(f.as_ref())).collect(),
            boost,
        }
    }
}

impl ConditionEvaluator for PreferredFormatCondition {
    fn name(&self) -> &str {
        "format_preferred"
    }

    fn boost(&self, record: &ResultRecord) -> f64 {
        if self.formats.contains(&record.format) {
            self.boost
        } else {
            0.0
        }
    }
}
