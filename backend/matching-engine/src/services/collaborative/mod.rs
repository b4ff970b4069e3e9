// ============================================
// Collaborative Model (协同过滤)
// ============================================
//
// Learners are compared by the ratings they gave to shared items: a
// learner x item matrix of mean ratings (0 where unrated) queried with raw
// cosine similarity.

use crate::error::{MatchingError, Result};
use crate::models::validate_finite;
use crate::services::model_handle::ModelHandle;
use crate::services::similarity_index::{CosineIndex, Neighbor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use validator::Validate;

pub const MIN_INTERACTIONS: usize = 10;

/// One learner rating one item (resource, session, expert).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Interaction {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub item_id: String,
    #[validate(range(min = 0.0, max = 5.0), custom(function = "validate_finite"))]
    pub rating: f64,
}

impl Interaction {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, rating: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborativeStats {
    pub trained: bool,
    pub n_users: usize,
    pub n_items: usize,
    pub n_interactions: usize,
    pub trained_at: Option<DateTime<Utc>>,
}

struct TrainedModel {
    index: CosineIndex,
    n_items: usize,
    n_interactions: usize,
}

#[derive(Default)]
pub struct CollaborativeModel {
    model: ModelHandle<TrainedModel>,
}

impl CollaborativeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the rating matrix. Repeated (user, item) pairs are averaged.
    /// Ratings must already be validated; a failed call keeps the previous model.
    pub fn train(&self, interactions: &[Interaction]) -> Result<CollaborativeStats> {
        if interactions.len() < MIN_INTERACTIONS {
            warn!(
                reason = "insufficient_training_data",
                required = MIN_INTERACTIONS,
                actual = interactions.len(),
                "Collaborative model training skipped"
            );
            return Err(MatchingError::InsufficientData {
                required: MIN_INTERACTIONS,
                actual: interactions.len(),
            });
        }

        let items: BTreeMap<&str, usize> = interactions
            .iter()
            .map(|i| i.item_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(column, item)| (item, column))
            .collect();

        // user -> column -> (sum, count)
        let mut sums: BTreeMap<&str, BTreeMap<usize, (f64, u32)>> = BTreeMap::new();
        for interaction in interactions {
            let column = items[interaction.item_id.as_str()];
            let cell = sums
                .entry(interaction.user_id.as_str())
                .or_default()
                .entry(column)
                .or_insert((0.0, 0));
            cell.0 += interaction.rating;
            cell.1 += 1;
        }

        let n_items = items.len();
        let rows = sums.into_iter().map(|(user, cells)| {
            let mut row = vec![0.0; n_items];
            for (column, (sum, count)) in cells {
                row[column] = sum / f64::from(count);
            }
            (user.to_string(), row)
        });

        let index = CosineIndex::build(rows, n_items, false)?;
        let trained = TrainedModel {
            index,
            n_items,
            n_interactions: interactions.len(),
        };
        let stats = Self::stats_of(&trained);
        self.model.store(trained);

        info!(
            n_users = stats.n_users,
            n_items = stats.n_items,
            n_interactions = stats.n_interactions,
            "Collaborative model trained"
        );
        Ok(stats)
    }

    /// Learners whose rating rows are closest to `user_id`'s.
    pub fn similar_users(&self, user_id: &str, k: usize) -> Result<Vec<Neighbor>> {
        let model = self
            .model
            .load()
            .ok_or_else(|| MatchingError::ModelUnavailable("collaborative model".to_string()))?;

        let row = model
            .index
            .row(user_id)
            .ok_or_else(|| MatchingError::NotFound(format!("user {user_id} has no interactions")))?;

        let exclude = BTreeSet::from([user_id]);
        let neighbors = model.index.nearest(&row, k, &exclude);

        debug!(user_id = %user_id, k = k, returned = neighbors.len(), "Collaborative model queried");
        Ok(neighbors)
    }

    pub fn stats(&self) -> CollaborativeStats {
        match self.model.load() {
            Some(model) => Self::stats_of(&model),
            None => CollaborativeStats {
                trained: false,
                n_users: 0,
                n_items: 0,
                n_interactions: 0,
                trained_at: None,
            },
        }
    }

    fn stats_of(model: &TrainedModel) -> CollaborativeStats {
        CollaborativeStats {
            trained: true,
            n_users: model.index.len(),
            n_items: model.n_items,
            n_interactions: model.n_interactions,
            trained_at: Some(model.index.trained_at),
        }
    }
}
