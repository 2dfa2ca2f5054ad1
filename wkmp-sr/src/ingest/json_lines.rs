//! Candidate source backed by a JSON-lines capture file
//!
//! Each non-blank line is one [`RawCandidate`]. Lines that fail to decode are
//! reported as malformed items; an unreadable file fails the stream. A
//! candidate is offered only if every word of the query occurs in its path,
//! which is how the network's own matching behaves.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CandidateSource, CandidateStream, SourceError};
use crate::models::RawCandidate;
use crate::scoring::features::normalize_text;

#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandidateSource for JsonLinesSource {
    fn search(&self, query: &str, _album_mode: bool) -> CandidateStream {
        let path = self.path.clone();
        let words: Vec<String> = normalize_text(query)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Box::pin(async_stream::stream! {
            let file = match File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    yield Err(SourceError::Provider(format!("{}: {}", path.display(), e)));
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(SourceError::Provider(format!("{}: {}", path.display(), e)));
                        return;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RawCandidate>(&line) {
                    Ok(candidate) => {
                        if matches_query(&candidate, &words) {
                            yield Ok(candidate);
                        }
                    }
                    Err(e) => yield Err(SourceError::Malformed(format!("line {}: {}", line_no, e))),
                }
            }
        })
    }
}

fn matches_query(candidate: &RawCandidate, words: &[String]) -> bool {
    let haystack = normalize_text(&candidate.filename);
    words.iter().all(|w| haystack.contains(w.as_str()))
}
