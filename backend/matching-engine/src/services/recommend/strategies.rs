use super::{RecommendRequest, RecommendStrategy, StrategyOutcome};
use crate::models::{DegradedReason, MatchSource};
use crate::services::similarity_index::{RuleBasedMatcher, SimilarityIndex};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// k-NN over the trained index, limited to the supplied pool.
pub struct SimilarityIndexStrategy {
    index: Arc<SimilarityIndex>,
}

impl SimilarityIndexStrategy {
    pub fn new(index: Arc<SimilarityIndex>) -> Self {
        Self { index }
    }
}

impl RecommendStrategy for SimilarityIndexStrategy {
    fn recommend(&self, request: &RecommendRequest<'_>) -> StrategyOutcome {
        if !self.index.is_trained() {
            return StrategyOutcome::Unavailable(DegradedReason::IndexUntrained);
        }

        let pool_ids: BTreeSet<&str> = request.pool.iter().map(|c| c.id.as_str()).collect();

        let neighbors = match self.index.query(request.user, usize::MAX, request.exclude_ids) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(user_id = %request.user.id, error = %e, "Similarity index query failed");
                return StrategyOutcome::Unavailable(DegradedReason::IndexUntrained);
            }
        };

        let mut notes = Vec::new();
        let missing = pool_ids
            .iter()
            .any(|id| *id != request.user.id && !self.index.contains(id));
        if missing {
            notes.push(DegradedReason::NotInIndex);
        }

        let mut ranked: Vec<_> = neighbors
            .into_iter()
            .filter(|n| pool_ids.contains(n.id.as_str()))
            .collect();

        if ranked.is_empty() && !pool_ids.is_empty() {
            // nothing in the pool is indexed; let the next strategy answer
            return StrategyOutcome::Unavailable(DegradedReason::NotInIndex);
        }

        ranked.truncate(request.k);
        StrategyOutcome::Ranked {
            neighbors: ranked,
            notes,
        }
    }

    fn source(&self) -> MatchSource {
        MatchSource::SimilarityIndex
    }
}

pub struct RuleBasedStrategy {
    matcher: RuleBasedMatcher,
}

impl RuleBasedStrategy {
    pub fn new(matcher: RuleBasedMatcher) -> Self {
        Self { matcher }
    }
}

impl RecommendStrategy for RuleBasedStrategy {
    fn recommend(&self, request: &RecommendRequest<'_>) -> StrategyOutcome {
        StrategyOutcome::Ranked {
            neighbors: self
                .matcher
                .rank(request.user, request.pool, request.k, request.exclude_ids),
            notes: Vec::new(),
        }
    }

    fn source(&self) -> MatchSource {
        MatchSource::RuleBased
    }
}
