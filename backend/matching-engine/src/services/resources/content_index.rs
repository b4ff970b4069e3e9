// ============================================
// Resource Content Index (内容相似度)
// ============================================
//
// Item-side counterpart of the learner index: resources are encoded as
// topic-category flags plus difficulty, rating and popularity, and queried by
// cosine similarity for "more like this" suggestions.

use crate::error::{MatchingError, Result};
use crate::models::Resource;
use crate::services::model_handle::ModelHandle;
use crate::services::similarity_index::{CosineIndex, Neighbor};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

/// Substrings checked against each lowercase resource topic.
const TOPIC_CATEGORIES: [&str; 8] = [
    "computer science",
    "mathematics",
    "physics",
    "chemistry",
    "biology",
    "psychology",
    "business",
    "engineering",
];

pub const RESOURCE_FEATURE_DIM: usize = TOPIC_CATEGORIES.len() + 3;

pub const MIN_CONTENT_CORPUS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentIndexStats {
    pub trained: bool,
    pub n_items: usize,
    pub trained_at: Option<DateTime<Utc>>,
}

/// `[category flags.., difficulty ordinal, rating, popularity]`
pub fn encode_resource(resource: &Resource) -> Vec<f64> {
    let topics: Vec<String> = resource.topics.iter().map(|t| t.to_lowercase()).collect();

    let mut vector: Vec<f64> = TOPIC_CATEGORIES
        .iter()
        .map(|category| {
            if topics.iter().any(|t| t.contains(category)) {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    vector.push(f64::from(resource.difficulty_level.ordinal()));
    vector.push(resource.rating);
    vector.push(resource.popularity);
    vector
}

#[derive(Default)]
pub struct ResourceContentIndex {
    model: ModelHandle<CosineIndex>,
}

impl ResourceContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Needs at least three distinct resources; a failed call keeps the
    /// previous model.
    pub fn train(&self, resources: &[Resource]) -> Result<ContentIndexStats> {
        let unique = resources.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>().len();
        if unique < MIN_CONTENT_CORPUS {
            warn!(
                reason = "insufficient_training_data",
                required = MIN_CONTENT_CORPUS,
                actual = unique,
                "Content index training skipped"
            );
            return Err(MatchingError::InsufficientData {
                required: MIN_CONTENT_CORPUS,
                actual: unique,
            });
        }

        let rows = resources.iter().map(|r| (r.id.clone(), encode_resource(r)));
        let index = CosineIndex::build(rows, RESOURCE_FEATURE_DIM, true)?;
        let stats = ContentIndexStats {
            trained: true,
            n_items: index.len(),
            trained_at: Some(index.trained_at),
        };
        self.model.store(index);

        info!(n_items = stats.n_items, "Content index trained");
        Ok(stats)
    }

    /// Resources most similar to `resource`, excluding itself.
    pub fn similar(&self, resource: &Resource, k: usize) -> Result<Vec<Neighbor>> {
        let model = self
            .model
            .load()
            .ok_or_else(|| MatchingError::ModelUnavailable("content index".to_string()))?;

        let query = Array1::from_vec(encode_resource(resource));
        let exclude = BTreeSet::from([resource.id.as_str()]);
        Ok(model.nearest(&query, k, &exclude))
    }

    pub fn stats(&self) -> ContentIndexStats {
        match self.model.load() {
            Some(model) => ContentIndexStats {
                trained: true,
                n_items: model.len(),
                trained_at: Some(model.trained_at),
            },
            None => ContentIndexStats {
                trained: false,
                n_items: 0,
                trained_at: None,
            },
        }
    }
}
