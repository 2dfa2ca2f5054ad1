//! Query text <-> filter state translation
//!
//! The filter state is authoritative. Two pure mappings connect it to the free
//! text field and are invoked at fixed points only:
//! - [`tokens_from_query`] on search submission (text -> filters)
//! - [`query_for_filter_change`] on a manual filter edit (filters -> text)
//!
//! Neither calls the other, so a submission can never echo back into the text
//! field and a toggle can never re-trigger extraction.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::models::filter_state::TOGGLE_FORMATS;
use crate::models::FilterState;

/// Bitrate-shaped token: `320`, `320+`, `>320`
static BITRATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{2,4}\+?|>\d{2,4})$").expect("invalid bitrate token regex"));

/// Forward-direction bitrate syntax: `>digits` or `digits+`
static MIN_BITRATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:>(\d+)|(\d+)\+)$").expect("invalid min bitrate regex"));

/// Result of extracting filter tokens from submitted query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenExtraction {
    /// Text to send to the network
    pub effective_query: String,
    /// `base` with every recognized token applied
    pub filter: FilterState,
    /// Recognized tokens in order of appearance
    pub recognized: Vec<String>,
}

/// Consume format and bitrate tokens from `query`.
///
/// Conflicting format tokens resolve to the last one. If nothing is
/// recognized the original text is returned verbatim. A query made only of
/// tokens still applies them, but the trimmed original text is sent so the
/// network never receives an empty search.
pub fn tokens_from_query(query: &str, base: &FilterState) -> TokenExtraction {
    let mut filter = base.clone();
    let mut recognized = Vec::new();
    let mut kept = Vec::new();

    for token in query.split_whitespace() {
        if let Some(format) = format_token(token) {
            filter.set_exclusive_format(format);
            recognized.push(token.to_string());
        } else if let Some(min) = min_bitrate_token(token) {
            filter.min_bitrate = min;
            if filter.max_bitrate < min {
                filter.max_bitrate = min;
            }
            recognized.push(token.to_string());
        } else {
            kept.push(token);
        }
    }

    let effective_query = if recognized.is_empty() {
        query.to_string()
    } else if kept.is_empty() {
        query.trim().to_string()
    } else {
        kept.join(" ")
    };

    TokenExtraction {
        effective_query,
        filter,
        recognized,
    }
}

fn format_token(token: &str) -> Option<&'static str> {
    TOGGLE_FORMATS
        .iter()
        .copied()
        .find(|format| format.eq_ignore_ascii_case(token))
}

fn min_bitrate_token(token: &str) -> Option<u32> {
    let caps = MIN_BITRATE_TOKEN.captures(token)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

/// Case-insensitive whole-word matcher for an arbitrary token
fn word_matcher(token: &str) -> Option<Regex> {
    let starts_word = token.chars().next().is_some_and(is_word_char);
    let ends_word = token.chars().last().is_some_and(is_word_char);
    let pattern = format!(
        "{}{}{}",
        if starts_word { r"\b" } else { r"(?:^|\s)" },
        regex::escape(token),
        if ends_word { r"\b" } else { r"(?:\s|$)" },
    );
    RegexBuilder::new(&pattern).case_insensitive(true).build().ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if `token` occurs in `query` as a whole word (case-insensitive)
pub fn contains_token(query: &str, token: &str) -> bool {
    word_matcher(token).is_some_and(|re| re.is_match(query))
}

/// Append `token` unless it is already present as a whole word
pub fn inject_token(query: &str, token: &str) -> String {
    let token = token.trim();
    if token.is_empty() || contains_token(query, token) {
        return query.to_string();
    }
    let base = query.trim_end();
    if base.is_empty() {
        token.to_string()
    } else {
        format!("{} {}", base, token)
    }
}

/// Remove every whole-word occurrence of `token` and collapse whitespace
pub fn remove_token(query: &str, token: &str) -> String {
    let Some(re) = word_matcher(token.trim()) else {
        return query.to_string();
    };
    let mut text = query.to_string();
    // Separator-consuming boundaries can hide an adjacent repeat; rerun until clean
    while re.is_match(&text) {
        text = re.replace_all(&text, " ").into_owned();
    }
    collapse_whitespace(&text)
}

/// Strip every bitrate-shaped token
pub fn strip_bitrate_tokens(query: &str) -> String {
    query
        .split_whitespace()
        .filter(|t| !BITRATE_TOKEN.is_match(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace any existing bitrate token with `token`
pub fn inject_bitrate_token(query: &str, token: &str) -> String {
    inject_token(&strip_bitrate_tokens(query), token)
}

/// Toggle format that is the only allowed format, if any
fn exclusive_format(state: &FilterState) -> Option<&'static str> {
    if state.allowed_formats.len() != 1 {
        return None;
    }
    TOGGLE_FORMATS
        .iter()
        .copied()
        .find(|format| state.allowed_formats.contains(*format))
}

/// Query text after a manual filter edit from `before` to `after`
///
/// A format token stands for "only this format", matching what
/// [`tokens_from_query`] reads back: it is injected when one toggle format
/// becomes exclusive and removed when that stops being the case. A changed
/// bitrate floor replaces the bitrate token (`N+`), or strips it when the
/// floor returns to 0.
pub fn query_for_filter_change(query: &str, before: &FilterState, after: &FilterState) -> String {
    let mut text = query.to_string();

    let was = exclusive_format(before);
    let now = exclusive_format(after);
    if was != now {
        if let Some(format) = was {
            text = remove_token(&text, &format.to_ascii_lowercase());
        }
        if let Some(format) = now {
            text = inject_token(&text, &format.to_ascii_lowercase());
        }
    }

    if before.min_bitrate != after.min_bitrate {
        text = if after.min_bitrate == 0 {
            strip_bitrate_tokens(&text)
        } else {
            inject_bitrate_token(&text, &format!("{}+", after.min_bitrate))
        };
    }

    text
}
