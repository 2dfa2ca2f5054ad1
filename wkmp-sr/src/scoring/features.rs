//! Sub-score extraction
//!
//! Every sub-score is normalized to `0.0..=1.0`. The default scorer works on
//! what a search result carries: nominal bitrate, format, remote queue depth
//! and the remote path.

use crate::models::{RankingContext, ResultRecord};

/// Normalized per-dimension scores for one record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub quality: f64,
    pub availability: f64,
    pub musical: f64,
    pub metadata: f64,
    pub string: f64,
}

impl SubScores {
    fn clamped(self) -> Self {
        let c = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            quality: c(self.quality),
            availability: c(self.availability),
            musical: c(self.musical),
            metadata: c(self.metadata),
            string: c(self.string),
        }
    }
}

/// Feature extraction contract used by the scoring engine
///
/// Implementations must be deterministic: the same record and context always
/// produce the same scores.
pub trait FeatureScorer: Send + Sync {
    /// Scorer name for diagnostics
    fn name(&self) -> &'static str;

    fn score(&self, record: &ResultRecord, context: &RankingContext) -> SubScores;
}

/// Version markers that change what a recording is
const VERSION_MARKERS: [&str; 11] = [
    "remix", "live", "edit", "instrumental", "acapella", "karaoke", "extended", "radio", "cover",
    "remaster", "remastered",
];

/// Heuristic scorer based on file metadata and path text
#[derive(Debug, Clone)]
pub struct DefaultFeatureScorer {
    /// Bitrate at which lossy quality saturates (kbps)
    pub reference_bitrate: f64,
    /// Queue depth at which availability halves
    pub queue_half_life: f64,
    /// Penalty per unrequested version marker
    pub version_penalty: f64,
}

impl Default for DefaultFeatureScorer {
    fn default() -> Self {
        Self {
            reference_bitrate: 320.0,
            queue_half_life: 10.0,
            version_penalty: 0.35,
        }
    }
}

impl FeatureScorer for DefaultFeatureScorer {
    fn name(&self) -> &'static str {
        "default"
    }

    fn score(&self, record: &ResultRecord, context: &RankingContext) -> SubScores {
        let subject = comparison_text(record, context);
        let query = normalize_text(&context.full_text());

        SubScores {
            quality: self.quality(record),
            availability: 1.0 / (1.0 + record.queue_depth as f64 / self.queue_half_life),
            musical: self.musical(&subject, &query),
            metadata: metadata_coverage(record, context),
            string: if query.is_empty() {
                0.0
            } else {
                strsim::jaro_winkler(&subject, &query)
            },
        }
        .clamped()
    }
}

impl DefaultFeatureScorer {
    fn quality(&self, record: &ResultRecord) -> f64 {
        if record.is_lossless() {
            1.0
        } else {
            (record.bitrate as f64 / self.reference_bitrate).min(1.0)
        }
    }

    /// 1.0 unless the candidate carries version markers the query did not ask for
    fn musical(&self, subject: &str, query: &str) -> f64 {
        let query_words: Vec<&str> = query.split_whitespace().collect();
        let unrequested = subject
            .split_whitespace()
            .filter(|w| VERSION_MARKERS.contains(w) && !query_words.contains(w))
            .count();
        1.0 - self.version_penalty * unrequested as f64
    }
}

/// Text the query is compared against: folder name in album mode, file stem
/// otherwise
fn comparison_text(record: &ResultRecord, context: &RankingContext) -> String {
    let raw = if context.album_mode {
        record.parent_dir().unwrap_or_else(|| record.file_stem())
    } else {
        record.file_stem()
    };
    normalize_text(raw)
}

/// Fraction of query words found anywhere in the remote path. Artist and
/// title count half each when both are present.
fn metadata_coverage(record: &ResultRecord, context: &RankingContext) -> f64 {
    let path = normalize_text(&record.filename);
    let path_words: Vec<&str> = path.split_whitespace().collect();
    let coverage = |text: &str| -> Option<f64> {
        let norm = normalize_text(text);
        let words: Vec<&str> = norm.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }
        let hits = words.iter().filter(|w| path_words.contains(w)).count();
        Some(hits as f64 / words.len() as f64)
    };

    match (coverage(&context.query_artist), coverage(&context.query_title)) {
        (Some(artist), Some(title)) => 0.5 * artist + 0.5 * title,
        (None, Some(title)) => title,
        (Some(artist), None) => artist,
        (None, None) => 0.0,
    }
}

/// Lowercase, turn separators into spaces, drop a leading track number and
/// collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let lowered: String = text
        .chars()
        .map(|c| match c {
            '_' | '.' | '-' | '\u{2013}' | '\\' | '/' | '(' | ')' | '[' | ']' => ' ',
            c => c,
        })
        .flat_map(char::to_lowercase)
        .collect();

    let mut words = lowered.split_whitespace().peekable();
    if let Some(first) = words.peek() {
        if first.len() <= 3 && first.chars().all(|c| c.is_ascii_digit()) {
            words.next();
        }
    }
    words.collect::<Vec<_>>().join(" ")
}
