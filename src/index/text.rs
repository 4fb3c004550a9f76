//! Tokenization, per-column term statistics and BM25 scoring for text
//! indexes.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::config::TextOptions;
use crate::query::fulltext::SimpleTerm;
use crate::value::{LikePattern, Value};

/// Lower-cased alphanumeric runs of `text`.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    split_words(text, char::is_alphanumeric)
}

/// Like [`tokenize`], but `*` and `?` stay inside words as wildcards.
fn query_words(text: &str) -> Vec<String> {
    split_words(text, |c| c.is_alphanumeric() || c == '*' || c == '?')
}

fn split_words(text: &str, in_word: impl Fn(char) -> bool) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if in_word(c) {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// One query word, possibly containing wildcards.
#[derive(Clone, Debug)]
pub(crate) enum WordPattern {
    Exact(String),
    Glob(LikePattern),
}

impl WordPattern {
    fn new(word: String) -> Result<Self, regex::Error> {
        if !word.contains(['*', '?']) {
            return Ok(WordPattern::Exact(word));
        }
        let like: String = word
            .chars()
            .map(|c| match c {
                '*' => '%',
                '?' => '_',
                other => other,
            })
            .collect();
        LikePattern::compile(&like).map(WordPattern::Glob)
    }

    fn matches(&self, token: &str) -> bool {
        match self {
            WordPattern::Exact(word) => word == token,
            WordPattern::Glob(pattern) => pattern.matches(token),
        }
    }
}

/// Reasons a full-text term cannot be turned into a [`Phrase`].
#[derive(Debug, Error)]
pub(crate) enum PhraseError {
    #[error("term '{0}' contains no searchable words")]
    NoWords(String),
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Consecutive query words that must appear in order.
#[derive(Clone, Debug)]
pub(crate) struct Phrase {
    words: Vec<WordPattern>,
}

impl Phrase {
    pub(crate) fn from_term(term: &SimpleTerm) -> Result<Self, PhraseError> {
        let words: Vec<_> = query_words(term.value())
            .into_iter()
            .map(WordPattern::new)
            .collect::<Result<_, _>>()?;
        if words.is_empty() {
            return Err(PhraseError::NoWords(term.value().to_owned()));
        }
        Ok(Self { words })
    }

    /// Occurrence count of the phrase in `tokens` and the smallest document
    /// frequency among the tokens it matched, or `None` when absent.
    pub(crate) fn occurrences(&self, tokens: &[String], stats: &ColumnStats) -> Option<(u32, u64)> {
        let width = self.words.len();
        if width == 0 || tokens.len() < width {
            return None;
        }
        let mut tf = 0u32;
        let mut df = u64::MAX;
        for window in tokens.windows(width) {
            if self
                .words
                .iter()
                .zip(window)
                .all(|(word, token)| word.matches(token))
            {
                tf += 1;
                for token in window {
                    df = df.min(stats.doc_freq(token).max(1));
                }
            }
        }
        (tf > 0).then_some((tf, df))
    }
}

/// Term statistics of one indexed property. Every stored value counts as a
/// document.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ColumnStats {
    values: u64,
    tokens: u64,
    doc_freq: HashMap<String, u64>,
}

impl ColumnStats {
    fn admit(&mut self, text: &str) {
        let tokens = tokenize(text);
        self.values += 1;
        self.tokens += tokens.len() as u64;
        for token in tokens.into_iter().collect::<BTreeSet<_>>() {
            *self.doc_freq.entry(token).or_insert(0) += 1;
        }
    }

    fn retract(&mut self, text: &str) {
        let tokens = tokenize(text);
        self.values = self.values.saturating_sub(1);
        self.tokens = self.tokens.saturating_sub(tokens.len() as u64);
        for token in tokens.into_iter().collect::<BTreeSet<_>>() {
            if let Some(count) = self.doc_freq.get_mut(&token) {
                *count -= 1;
                if *count == 0 {
                    self.doc_freq.remove(&token);
                }
            }
        }
    }

    pub(crate) fn doc_freq(&self, token: &str) -> u64 {
        self.doc_freq.get(token).copied().unwrap_or(0)
    }

    fn average_length(&self) -> f32 {
        if self.values == 0 {
            0.0
        } else {
            self.tokens as f32 / self.values as f32
        }
    }
}

/// Statistics for every column of a text index, maintained incrementally as
/// values are committed and removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TextStats {
    columns: HashMap<String, ColumnStats>,
}

impl TextStats {
    pub(crate) fn admit(&mut self, property: &str, values: &[Value]) {
        let column = self.columns.entry(property.to_owned()).or_default();
        for value in values {
            column.admit(&value.to_canonical_string());
        }
    }

    pub(crate) fn retract(&mut self, property: &str, values: &[Value]) {
        if let Some(column) = self.columns.get_mut(property) {
            for value in values {
                column.retract(&value.to_canonical_string());
            }
            if column.values == 0 {
                self.columns.remove(property);
            }
        }
    }

    pub(crate) fn column(&self, property: &str) -> Option<&ColumnStats> {
        self.columns.get(property)
    }
}

/// Okapi BM25 normalized into `(0, 1]`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Bm25 {
    k1: f32,
    b: f32,
}

impl Bm25 {
    pub(crate) fn new(options: TextOptions) -> Self {
        Self {
            k1: options.k1,
            b: options.b,
        }
    }

    /// Score of a document of `doc_len` tokens containing a term `tf` times,
    /// where `df` documents of the column contain it.
    pub(crate) fn score(&self, stats: &ColumnStats, tf: u32, df: u64, doc_len: usize) -> f32 {
        let n = stats.values.max(1) as f32;
        let df = df.min(stats.values.max(1)) as f32;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        let idf = idf / (1.0 + idf);

        let avg = stats.average_length();
        let length_norm = if avg > 0.0 {
            1.0 - self.b + self.b * doc_len as f32 / avg
        } else {
            1.0
        };
        let tf = tf as f32;
        let tf = tf / (tf + self.k1 * length_norm);

        (idf * tf).clamp(f32::MIN_POSITIVE, 1.0)
    }
}
