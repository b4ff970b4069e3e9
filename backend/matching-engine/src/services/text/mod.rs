// ============================================
// Text Similarity (文本相似度)
// ============================================
//
// Shared tokenizer plus a pairwise TF-IDF cosine used by the compatibility
// scorer and the expert ranker. The pairwise form treats the two inputs as the
// whole corpus, so no vectorizer has to be fitted per call.

mod stopwords;

pub use stopwords::{is_stop_word, ENGLISH_STOP_WORDS};

use std::collections::BTreeMap;

/// Lowercase, split on non-alphanumeric characters, keep tokens of at least
/// two characters that are not stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2 && !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

fn term_counts(text: &str) -> BTreeMap<String, f64> {
    let mut counts = BTreeMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

/// Cosine similarity of two texts under TF-IDF weights fitted on the pair.
///
/// Smoothed idf over two documents: a term present in both weighs 1.0, a term
/// present in one weighs `1 + ln(1.5)`. Returns `None` when either side has no
/// indexable terms so callers can pick their own neutral value.
pub fn tfidf_cosine(a: &str, b: &str) -> Option<f64> {
    let counts_a = term_counts(a);
    let counts_b = term_counts(b);
    if counts_a.is_empty() || counts_b.is_empty() {
        return None;
    }

    let unique_idf = 1.0 + 1.5f64.ln();
    let idf = |term: &str| {
        if counts_a.contains_key(term) && counts_b.contains_key(term) {
            1.0
        } else {
            unique_idf
        }
    };

    let norm = |counts: &BTreeMap<String, f64>| {
        counts
            .iter()
            .map(|(term, tf)| (tf * idf(term)).powi(2))
            .sum::<f64>()
            .sqrt()
    };

    // Shared terms carry idf 1.0 on both sides.
    let dot: f64 = counts_a
        .iter()
        .filter_map(|(term, tf_a)| counts_b.get(term).map(|tf_b| tf_a * tf_b))
        .sum();

    let denom = norm(&counts_a) * norm(&counts_b);
    if denom <= 0.0 {
        return None;
    }

    Some((dot / denom).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("Help with the C++ and Machine-Learning!");
        assert_eq!(tokens, vec!["help", "machine", "learning"]);
    }

    #[test]
    fn test_identical_texts() {
        let score = tfidf_cosine("linear algebra", "Linear Algebra").unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(tfidf_cosine("physics optics", "poetry drama"), Some(0.0));
    }

    #[test]
    fn test_empty_side_returns_none() {
        assert_eq!(tfidf_cosine("", "physics"), None);
        assert_eq!(tfidf_cosine("the and of", "physics"), None);
    }

    #[test]
    fn test_symmetric() {
        let a = "computer science machine learning data";
        let b = "data science statistics";
        let ab = tfidf_cosine(a, b).unwrap();
        let ba = tfidf_cosine(b, a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_partial_overlap_value() {
        // shared "physics" (w=1), one unique term per side (w=1+ln1.5)
        let score = tfidf_cosine("physics optics", "physics drama").unwrap();
        let u = 1.0 + 1.5f64.ln();
        let expected = 1.0 / (1.0 + u * u);
        assert!((score - expected).abs() < 1e-12);
    }
}
