//! Keyword Extractor: ranks salient words and phrases in a job posting.
//!
//! Pure and deterministic: no I/O, no shared mutable state. Empty or
//! symbol-only input yields an empty list.
//!
//! Passes, in order:
//! 1. normalize: lower-case, punctuation → space, split on whitespace
//! 2. known phrases, in dictionary order; each match is masked
//! 3. bigrams over the masked tokens; each new bigram is masked
//! 4. remaining unmasked tokens as unigrams
//! 5. score = (count / total counted) × weight, weight 1.5 for phrases
//! 6. stable sort by score, truncate to the cap

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::keywords::dictionary::{is_stop_word, PhraseDictionary};

/// Characters replaced with a space during normalization.
const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '/', '\\', '-', '_', '+', '=',
    '*', '&', '%', '$', '#', '@',
];

/// Filler for masked tokens. Normalization strips it from input, so a masked
/// token can never collide with a real one.
pub const MASK: char = '#';

pub const DEFAULT_MAX_TERMS: usize = 50;

const PHRASE_WEIGHT: f64 = 1.5;
const WORD_WEIGHT: f64 = 1.0;

/// A scored word or phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    pub score: f64,
    pub occurrences: u32,
}


#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    dictionary: Arc<PhraseDictionary>,
    max_terms: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TERMS)
    }
}

impl KeywordExtractor {
    pub fn new(max_terms: usize) -> Self {
        Self {
            dictionary: PhraseDictionary::builtin(),
            max_terms,
        }
    }

    #[cfg(test)]
    pub fn with_dictionary(mut self, dictionary: Arc<PhraseDictionary>) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// Extracts ranked terms, highest score first, at most `max_terms` long.
    pub fn extract(&self, text: &str) -> Vec<Term> {
        let mut tokens = normalize(text);
        let mut tally = Tally::default();

        for phrase in self.dictionary.phrases() {
            if tally.contains(&phrase.text) {
                continue;
            }
            let count = mask_occurrences(&mut tokens, &phrase.tokens);
            if count > 0 {
                tally.add(&phrase.text, count);
            }
        }

        // Candidate pairs come from the text as it stood after the phrase pass;
        // counting runs against the live tokens, so a pair that overlaps an
        // earlier bigram no longer matches.
        let snapshot = tokens.clone();
        for pair in snapshot.windows(2) {
            if !is_candidate(&pair[0]) || !is_candidate(&pair[1]) {
                continue;
            }
            let bigram = pair.join(" ");
            if tally.contains(&bigram) {
                continue;
            }
            let count = mask_occurrences(&mut tokens, pair);
            if count > 0 {
                tally.add(&bigram, count);
            }
        }

        for token in tokens.iter().filter(|t| is_candidate(t)) {
            tally.add(token, 1);
        }

        tally.into_ranked(self.max_terms)
    }

    /// Texts of the top `n` terms, in ranked order.
    pub fn top_terms(&self, text: &str, n: usize) -> Vec<String> {
        self.extract(text)
            .into_iter()
            .take(n)
            .map(|term| term.text)
            .collect()
    }
}

/// Lower-cases, strips punctuation, and splits on whitespace.
pub fn normalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace(PUNCTUATION, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_candidate(token: &str) -> bool {
    !token.contains(MASK) && token.chars().count() > 2 && !is_stop_word(token)
}

/// Replaces every non-overlapping occurrence of `phrase` with one masked token
/// of the same character length. Returns the number of occurrences.
fn mask_occurrences<S: AsRef<str>>(tokens: &mut Vec<String>, phrase: &[S]) -> u32 {
    let width = phrase.len();
    if width == 0 || tokens.len() < width {
        return 0;
    }

    let mut count = 0;
    let mut masked = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let matches = i + width <= tokens.len()
            && tokens[i..i + width]
                .iter()
                .zip(phrase)
                .all(|(token, part)| token == part.as_ref());
        if matches {
            let chars: usize = phrase.iter().map(|p| p.as_ref().chars().count()).sum();
            masked.push(MASK.to_string().repeat(chars + width - 1));
            count += 1;
            i += width;
        } else {
            masked.push(std::mem::take(&mut tokens[i]));
            i += 1;
        }
    }

    *tokens = masked;
    count
}

/// Term counts in first-discovery order.
#[derive(Default)]
struct Tally {
    terms: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }

    fn add(&mut self, term: &str, count: u32) {
        match self.index.get(term) {
            Some(&slot) => self.terms[slot].1 += count,
            None => {
                self.index.insert(term.to_string(), self.terms.len());
                self.terms.push((term.to_string(), count));
            }
        }
    }

    fn into_ranked(self, max_terms: usize) -> Vec<Term> {
        let total: u32 = self.terms.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<Term> = self
            .terms
            .into_iter()
            .map(|(text, occurrences)| {
                let weight = if text.contains(' ') {
                    PHRASE_WEIGHT
                } else {
                    WORD_WEIGHT
                };
                Term {
                    score: occurrences as f64 / total as f64 * weight,
                    text,
                    occurrences,
                }
            })
            .collect();

        // sort_by is stable: equal scores keep discovery order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(max_terms);
        ranked
    }
}
