//! Extractive summarization.
//!
//! A [`Summarizer`] picks the most representative sentences of a text and
//! returns them in their original order. [`FrequencySummarizer`] scores
//! sentences by the document frequency of their stemmed content words.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use stop_words::LANGUAGE;

use crate::error::{AppError, Result};

pub trait Summarizer: Send + Sync {
    /// Selects at most `sentence_count` sentences, in original order.
    fn summarize(&self, text: &str, sentence_count: usize) -> Vec<String>;
}

static WORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}]+)?").expect("Failed to compile word regex"));

/// Snowball stemmer and stop-word list for one language.
pub struct FrequencySummarizer {
    stemmer: Stemmer,
    stop_words: HashSet<String>,
}

impl FrequencySummarizer {
    pub fn english() -> Self {
        Self::with_profile(Algorithm::English, LANGUAGE::English)
    }

    pub fn for_language(language: &str) -> Result<Self> {
        let (algorithm, stop_list) = match language.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => (Algorithm::English, LANGUAGE::English),
            "french" | "fr" => (Algorithm::French, LANGUAGE::French),
            "german" | "de" => (Algorithm::German, LANGUAGE::German),
            "spanish" | "es" => (Algorithm::Spanish, LANGUAGE::Spanish),
            "italian" | "it" => (Algorithm::Italian, LANGUAGE::Italian),
            "portuguese" | "pt" => (Algorithm::Portuguese, LANGUAGE::Portuguese),
            "dutch" | "nl" => (Algorithm::Dutch, LANGUAGE::Dutch),
            "swedish" | "sv" => (Algorithm::Swedish, LANGUAGE::Swedish),
            "norwegian" | "no" => (Algorithm::Norwegian, LANGUAGE::Norwegian),
            "danish" | "da" => (Algorithm::Danish, LANGUAGE::Danish),
            "finnish" | "fi" => (Algorithm::Finnish, LANGUAGE::Finnish),
            "russian" | "ru" => (Algorithm::Russian, LANGUAGE::Russian),
            other => {
                return Err(AppError::Config(format!("Unsupported summary language: {}", other)));
            }
        };
        Ok(Self::with_profile(algorithm, stop_list))
    }

    fn with_profile(algorithm: Algorithm, stop_list: LANGUAGE) -> Self {
        let stop_words = stop_words::get(stop_list)
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        Self {
            stemmer: Stemmer::create(algorithm),
            stop_words,
        }
    }

    fn stem(&self, word: &str) -> String {
        self.stemmer.stem(word).into_owned()
    }

    fn terms(&self, sentence: &str) -> Vec<String> {
        WORD_REGEX
            .find_iter(sentence)
            .map(|m| m.as_str().to_lowercase())
            .filter(|w| !self.stop_words.contains(w))
            .map(|w| self.stem(&w))
            .collect()
    }
}

impl Summarizer for FrequencySummarizer {
    fn summarize(&self, text: &str, sentence_count: usize) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentence_count == 0 {
            return Vec::new();
        }
        if sentences.len() <= sentence_count {
            return sentences;
        }

        let terms: Vec<Vec<String>> = sentences.iter().map(|s| self.terms(s)).collect();

        let mut frequencies: HashMap<&str, usize> = HashMap::new();
        for term in terms.iter().flatten() {
            *frequencies.entry(term.as_str()).or_default() += 1;
        }
        let max_frequency = frequencies.values().copied().max().unwrap_or(1) as f64;

        let mut scored: Vec<(usize, f64)> = terms
            .iter()
            .enumerate()
            .map(|(index, sentence_terms)| {
                if sentence_terms.is_empty() {
                    return (index, 0.0);
                }
                let total: f64 = sentence_terms
                    .iter()
                    .map(|t| frequencies[t.as_str()] as f64 / max_frequency)
                    .sum();
                (index, total / sentence_terms.len() as f64)
            })
            .collect();

        // Highest score first, earlier sentence wins ties.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut chosen: Vec<usize> = scored.into_iter().take(sentence_count).map(|(i, _)| i).collect();
        chosen.sort_unstable();

        chosen.into_iter().map(|i| sentences[i].clone()).collect()
    }
}

/// Splits on `.`, `!` or `?` followed by whitespace or the end of the text.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | '”' | '’') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().is_none_or(|n| n.is_whitespace()) {
                push_sentence(&mut sentences, &current);
                current.clear();
            }
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

/// Runs the summarizer off the async runtime and joins the result into prose.
pub async fn summarize_text(
    summarizer: Arc<dyn Summarizer>,
    text: String,
    sentence_count: usize,
) -> Result<String> {
    let sentences = tokio::task::spawn_blocking(move || summarizer.summarize(&text, sentence_count))
        .await
        .map_err(|e| AppError::Internal(format!("Summarization task failed: {}", e)))?;

    Ok(sentences.join(" "))
}
