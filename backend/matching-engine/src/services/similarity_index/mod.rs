// ============================================
// Similarity Index (相似度索引)
// ============================================
//
// Brute-force cosine k-NN over standardized learner feature vectors.
// State: Untrained -> train() -> Trained -> train() -> Trained (replaced).
// A failed train() leaves the previous state in place.

mod cosine;
pub mod fallback;

pub(crate) use cosine::CosineIndex;
pub use fallback::RuleBasedMatcher;

use crate::error::{MatchingError, Result};
use crate::models::UserProfile;
use crate::services::features::{FeatureEncoder, FEATURE_DIM};
use crate::services::model_handle::ModelHandle;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// A ranked neighbor; for the index `similarity` is `1 - cosine distance`,
/// for the rule-based matcher it is the rule score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub trained: bool,
    pub corpus_size: usize,
    pub trained_at: Option<DateTime<Utc>>,
}

pub struct SimilarityIndex {
    encoder: FeatureEncoder,
    model: ModelHandle<CosineIndex>,
    min_corpus: usize,
}

impl SimilarityIndex {
    pub fn new(min_corpus: usize) -> Self {
        Self {
            encoder: FeatureEncoder::new(),
            model: ModelHandle::empty(),
            min_corpus,
        }
    }

    /// Fit on `corpus`, replacing any previous state. Fails with
    /// `InsufficientData` below the minimum corpus size and keeps the old state.
    pub fn train(&self, corpus: &[UserProfile]) -> Result<IndexStats> {
        let unique = corpus
            .iter()
            .map(|u| u.id.as_str())
            .collect::<HashSet<_>>()
            .len();

        if unique < self.min_corpus {
            warn!(
                reason = "insufficient_training_data",
                required = self.min_corpus,
                actual = unique,
                "Similarity index training skipped"
            );
            return Err(MatchingError::InsufficientData {
                required: self.min_corpus,
                actual: unique,
            });
        }

        let rows = corpus
            .iter()
            .map(|user| (user.id.clone(), self.encoder.encode(user).to_vec()));
        let trained = CosineIndex::build(rows, FEATURE_DIM, true)?;
        let stats = IndexStats {
            trained: true,
            corpus_size: trained.len(),
            trained_at: Some(trained.trained_at),
        };
        self.model.store(trained);

        info!(
            corpus_size = stats.corpus_size,
            duplicates = corpus.len() - stats.corpus_size,
            "Similarity index trained"
        );

        Ok(stats)
    }

    /// Nearest neighbors of `user`, excluding the user's own id and
    /// `exclude_ids`. Ordered by similarity desc, then id asc.
    pub fn query(
        &self,
        user: &UserProfile,
        k: usize,
        exclude_ids: &BTreeSet<String>,
    ) -> Result<Vec<Neighbor>> {
        let model = self
            .model
            .load()
            .ok_or_else(|| MatchingError::ModelUnavailable("similarity index".to_string()))?;

        let query = Array1::from_vec(self.encoder.encode(user).to_vec());
        let mut exclude: BTreeSet<&str> = exclude_ids.iter().map(String::as_str).collect();
        exclude.insert(user.id.as_str());

        let neighbors = model.nearest(&query, k, &exclude);

        debug!(
            user_id = %user.id,
            k = k,
            returned = neighbors.len(),
            "Similarity index queried"
        );

        Ok(neighbors)
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_loaded()
    }

    /// Whether `id` is part of the trained corpus. False when untrained.
    pub fn contains(&self, id: &str) -> bool {
        self.model
            .load()
            .map(|m| m.contains(id))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> IndexStats {
        match self.model.load() {
            Some(model) => IndexStats {
                trained: true,
                corpus_size: model.len(),
                trained_at: Some(model.trained_at),
            },
            None => IndexStats {
                trained: false,
                corpus_size: 0,
                trained_at: None,
            },
        }
    }
}

/// Score desc, id asc.
pub(crate) fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
