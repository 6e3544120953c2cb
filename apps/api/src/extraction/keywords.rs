//! Deterministic frequency-ranked keyword extraction.
//!
//! This is the always-on half of the hybrid extractor: it must produce the
//! same output for the same text regardless of whether the external model is
//! reachable, so it carries its own stop-word list instead of depending on a
//! downloaded corpus.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Hard cap on the ranked keyword list.
pub const MAX_KEYWORDS: usize = 40;

/// English stop words filtered out of keyword ranking.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now",
];

/// A ranked keyword with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub token: String,
    pub frequency: u32,
}

/// Frequency-count keyword extractor over whitespace-tokenized text.
pub struct KeywordExtractor {
    stop_words: HashSet<&'static str>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Extracts up to `max_keywords` tokens ranked by descending frequency.
    ///
    /// Normalization: lowercase, every character outside letters/digits/
    /// whitespace becomes a space, then whitespace tokenization with stop
    /// words dropped. Ties rank by first occurrence in the text, so the
    /// output is fully deterministic. Empty input yields an empty list.
    pub fn extract(&self, text: &str, max_keywords: usize) -> Vec<KeywordCount> {
        if text.is_empty() {
            return Vec::new();
        }

        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let mut counts: HashMap<&str, u32> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for token in normalized.split_whitespace() {
            if self.stop_words.contains(token) {
                continue;
            }
            let count = counts.entry(token).or_insert(0);
            if *count == 0 {
                first_seen.push(token);
            }
            *count += 1;
        }

        let mut ranked: Vec<(usize, &str, u32)> = first_seen
            .iter()
            .enumerate()
            .map(|(order, &token)| (order, token, counts[token]))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(max_keywords)
            .map(|(_, token, frequency)| KeywordCount {
                token: token.to_string(),
                frequency,
            })
            .collect()
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}
