//! Extractive answer composition.
//!
//! Turns ranked results into:
//! - a short summary built from the leading sentences of each result
//! - one citation per result whose snippet is the sentence closest to the
//!   query
//!
//! Also hosts the triage filter that rejects throwaway queries before any
//! retrieval happens.

use serde::{Deserialize, Serialize};

use super::store::ScoredResult;
use super::text::{
    char_len, clean_trailing_fragment, similarity_ratio, split_sentences, truncate_chars,
};

pub const SUMMARY_FALLBACK: &str = "Found documents but could not extract a meaningful summary.";
pub const TRIAGE_RESPONSE: &str =
    "Sorry, I can't help with that. Try asking a question about the indexed documents.";

/// Configuration for answer composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Character budget for the whole summary
    pub summary_max_chars: usize,
    /// Leading sentences shorter than this get the next sentence appended
    pub summary_short_sentence: usize,
    /// Maximum citation snippet length in characters
    pub snippet_max_chars: usize,
    /// Best-matching sentences shorter than this get the next one appended
    pub snippet_short_sentence: usize,
    /// Phrases that mark a query as out of scope
    pub denylist: Vec<String>,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            summary_max_chars: 600,
            summary_short_sentence: 100,
            snippet_max_chars: 180,
            snippet_short_sentence: 50,
            denylist: default_denylist(),
        }
    }
}

pub fn default_denylist() -> Vec<String> {
    [
        "tell me a joke",
        "how are you",
        "who are you",
        "what is your name",
        "are you human",
        "how old are you",
        "where are you from",
        "what is the meaning of life",
    ]
    .iter()
    .map(|phrase| phrase.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub snippet: String,
    pub source_url: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedAnswer {
    pub summary: String,
    pub citations: Vec<Citation>,
}

pub struct AnswerComposer {
    config: AnswerConfig,
    denylist: Vec<Vec<String>>,
}

impl AnswerComposer {
    pub fn new(config: AnswerConfig) -> Self {
        let denylist = config
            .denylist
            .iter()
            .map(|phrase| normalize_words(phrase))
            .filter(|words| !words.is_empty())
            .collect();
        Self { config, denylist }
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    /// True when the query should get the fixed triage response instead of
    /// a retrieval: two words or fewer, or a denylisted phrase.
    pub fn should_triage(&self, query: &str) -> bool {
        if query.split_whitespace().count() <= 2 {
            return true;
        }

        let words = normalize_words(query);
        self.denylist.iter().any(|phrase| {
            words
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
    }

    /// Compose the summary and citations for `ranked` (best first).
    pub fn compose(&self, ranked: &[ScoredResult], query: &str) -> ComposedAnswer {
        let summary = clean_trailing_fragment(&self.summarize(ranked));
        let summary = if summary.is_empty() {
            SUMMARY_FALLBACK.to_string()
        } else {
            summary
        };

        let citations = ranked
            .iter()
            .map(|result| Citation {
                snippet: self.highlight(&result.record.text, query),
                source_url: result.record.source_url.clone(),
                score: result.score,
            })
            .collect();

        ComposedAnswer { summary, citations }
    }

    fn summarize(&self, ranked: &[ScoredResult]) -> String {
        let mut accepted: Vec<String> = Vec::new();
        let mut total = 0;

        for result in ranked {
            let text = result.record.text.trim();
            if text.is_empty() {
                continue;
            }

            let sentences = split_sentences(text);
            let mut candidate = sentences[0].to_string();
            if char_len(&candidate) < self.config.summary_short_sentence && sentences.len() > 1 {
                candidate.push(' ');
                candidate.push_str(sentences[1]);
            }
            let candidate = candidate.trim().to_string();

            if accepted.contains(&candidate) {
                continue;
            }
            let length = char_len(&candidate);
            if total + length > self.config.summary_max_chars {
                break;
            }
            total += length;
            accepted.push(candidate);
        }

        accepted.join(" ")
    }

    fn highlight(&self, text: &str, query: &str) -> String {
        let sentences = split_sentences(text.trim());
        let query = query.to_lowercase();

        let mut best_idx = 0;
        let mut best_ratio = f64::MIN;
        for (idx, sentence) in sentences.iter().enumerate() {
            let ratio = similarity_ratio(&sentence.to_lowercase(), &query);
            if ratio > best_ratio {
                best_idx = idx;
                best_ratio = ratio;
            }
        }

        let mut snippet = sentences[best_idx].to_string();
        if char_len(&snippet) < self.config.snippet_short_sentence
            && best_idx + 1 < sentences.len()
        {
            snippet.push(' ');
            snippet.push_str(sentences[best_idx + 1]);
        }

        clean_trailing_fragment(truncate_chars(&snippet, self.config.snippet_max_chars))
    }
}

/// Lowercase words with ASCII punctuation removed.
fn normalize_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|ch| !ch.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
