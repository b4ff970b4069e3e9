// ============================================
// TF-IDF Vectorizer (词频-逆文档频率)
// ============================================
//
// Unigram + bigram terms over the shared tokenizer, smoothed idf
// `ln((1 + n) / (1 + df)) + 1`, L2-normalized sparse output.

use crate::error::{MatchingError, Result};
use crate::services::text::tokenize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse row: (feature index, weight), sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    /// Feature names in index order
    terms: Vec<String>,
    idf: Vec<f64>,
}

/// Unigrams followed by adjacent-token bigrams.
pub fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();

    let mut terms = tokens;
    terms.extend(bigrams);
    terms
}

impl TfidfVectorizer {
    /// Fit vocabulary and idf. Keeps the `max_features` terms with the highest
    /// corpus frequency, ties broken alphabetically.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Result<Self> {
        let mut corpus_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = ngrams(doc.as_ref());
            let unique: BTreeSet<&String> = terms.iter().collect();
            for term in unique {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *corpus_counts.entry(term).or_insert(0) += 1;
            }
        }

        if corpus_counts.is_empty() {
            return Err(MatchingError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut ranked: Vec<(String, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features.max(1));

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();

        Ok(Self {
            vocabulary,
            terms,
            idf,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    /// Empty when the text has no in-vocabulary term.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }

    /// Highest-weighted terms of `text`, weight desc then term asc.
    pub fn top_terms(&self, text: &str, n: usize) -> Vec<(String, f64)> {
        let mut scored: Vec<(String, f64)> = self
            .transform(text)
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(idx, w)| (self.terms[idx].clone(), w))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(n);
        scored
    }
}
