//! Keyword tag derivation.
//!
//! Tags are a small set of display-only keywords attached to each chunk.
//! They are derived by crude word-frequency ranking; nothing downstream
//! depends on their quality, so the implementation favors being cheap and
//! deterministic.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Maximum number of tags derived per text.
pub const MAX_TAGS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "will", "been", "would", "could", "should", "their",
    "there", "about", "which", "these", "other", "more", "some", "such", "only", "than", "into",
    "over", "when", "then", "them", "were", "what", "your",
];

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[a-zA-Z]{4,15}\b").expect("static pattern compiles"))
}

/// How tags are assigned to a file's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagPolicy {
    /// Derive tags from the file's first chunk and replicate them to every
    /// chunk of that file. Bounds cost for large files.
    #[default]
    PerFile,
    /// Derive tags independently for each chunk.
    PerChunk,
}

/// Derive up to [`MAX_TAGS`] keyword tags from `text`, most frequent first.
/// Ties break alphabetically so the result is deterministic.
pub fn derive_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for mat in word_pattern().find_iter(&lowered) {
        let word = mat.as_str();
        if !STOP_WORDS.contains(&word) {
            *freq.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_TAGS)
        .map(|(word, _)| word.to_string())
        .collect()
}
