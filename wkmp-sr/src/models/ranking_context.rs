//! Query context used by the textual similarity measures

use serde::{Deserialize, Serialize};

const SEPARATORS: [&str; 2] = [" - ", " \u{2013} "];

/// Artist and title parsed once per search from the effective query text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingContext {
    /// May be empty when the query has no "Artist - Title" separator
    pub query_artist: String,
    pub query_title: String,
    /// Album searches compare against folder names instead of file names
    pub album_mode: bool,
}

impl RankingContext {
    /// Split `"Artist - Title"` (hyphen or en dash) on the first separator.
    /// Without a separator the whole text is the title.
    pub fn parse(query: &str, album_mode: bool) -> Self {
        let query = query.trim();
        let split = SEPARATORS
            .iter()
            .filter_map(|sep| query.find(sep).map(|at| (at, sep.len())))
            .min_by_key(|(at, _)| *at);

        let (artist, title) = match split {
            Some((at, len)) => (query[..at].trim(), query[at + len..].trim()),
            None => ("", query),
        };

        Self {
            query_artist: artist.to_string(),
            query_title: title.to_string(),
            album_mode,
        }
    }

    /// Artist and title joined for whole-string comparison
    pub fn full_text(&self) -> String {
        if self.query_artist.is_empty() {
            self.query_title.clone()
        } else {
            format!("{} {}", self.query_artist, self.query_title)
        }
    }
}
