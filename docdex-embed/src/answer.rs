//! Answer synthesis over retrieved context.
//!
//! Retrieval returns chunks; callers often want a sentence-level answer.
//! The [`AnswerGenerator`] trait is the seam for a real language model; the
//! shipped [`ExtractiveAnswerer`] is the model-free fallback: it scores
//! sentences in the retrieved context by keyword overlap with the question
//! and returns the best one or two. A generator returning `Ok(None)` means
//! "no answer found", distinct from an error.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

const MAX_ANSWER_LEN: usize = 300;

const FILLER_WORDS: &[&str] = &["the", "and", "for", "that", "this"];

fn question_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(what|where|when|who|why|how|which|did|does|is|are|was|were)\b")
            .expect("static pattern compiles")
    })
}

fn term_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("static pattern compiles"))
}

fn sentence_boundary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.!?]\s+").expect("static pattern compiles"))
}

/// Generates an answer to `question` grounded in `context`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, context: &str, question: &str) -> Result<Option<String>>;
}

/// Model-free extractive answerer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveAnswerer;

#[async_trait]
impl AnswerGenerator for ExtractiveAnswerer {
    async fn generate(&self, context: &str, question: &str) -> Result<Option<String>> {
        Ok(extract_answer(context, question))
    }
}

/// Pick the sentences of `text` that best match the question's key terms.
///
/// Returns `None` when the question has no usable terms or nothing in the
/// text matches them.
pub fn extract_answer(text: &str, question: &str) -> Option<String> {
    if text.is_empty() || question.is_empty() {
        return None;
    }

    let lowercased = question.to_lowercase();
    let cleaned = question_word_pattern().replace_all(&lowercased, "");
    let terms: Vec<String> = term_pattern()
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_string())
        .filter(|w| !FILLER_WORDS.contains(&w.as_str()))
        .collect();
    if terms.is_empty() {
        return None;
    }

    let mut scored: Vec<(usize, &str)> = sentence_boundary()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .map(|sentence| {
            let lower = sentence.to_lowercase();
            let score = terms.iter().filter(|t| lower.contains(t.as_str())).count();
            (score, sentence)
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    if scored.is_empty() {
        return None;
    }
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut answer = scored
        .iter()
        .take(2)
        .map(|(_, s)| s.trim())
        .collect::<Vec<_>>()
        .join(" ");
    if answer.len() > MAX_ANSWER_LEN {
        let mut cut = MAX_ANSWER_LEN - 3;
        while !answer.is_char_boundary(cut) {
            cut -= 1;
        }
        answer.truncate(cut);
        answer.push_str("...");
    }
    Some(answer)
}

/// Short extractive summary: the first couple of substantial sentences.
pub fn summarize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let picked: Vec<&str> = sentence_boundary()
        .split(&collapsed)
        .filter(|s| s.len() > 30)
        .take(2)
        .collect();

    if !picked.is_empty() {
        return picked.join(" ");
    }
    if collapsed.len() > 150 {
        let mut cut = 147;
        while !collapsed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &collapsed[..cut])
    } else {
        collapsed
    }
}
