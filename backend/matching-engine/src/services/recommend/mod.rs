// ============================================
// User Recommendation Layer
// ============================================
//
// Ordered strategy list: [similarity_index, rule_based].
// The first strategy that is available produces the ranking; every skipped
// strategy leaves its reason on the result.

mod strategies;

pub use strategies::{RuleBasedStrategy, SimilarityIndexStrategy};

use crate::models::{DegradedReason, MatchSource, UserProfile};
use crate::services::compatibility::CompatibilityScorer;
use crate::services::similarity_index::{Neighbor, RuleBasedMatcher, SimilarityIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// What a strategy reports back for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Ranked {
        neighbors: Vec<Neighbor>,
        notes: Vec<DegradedReason>,
    },
    Unavailable(DegradedReason),
}

pub struct RecommendRequest<'a> {
    pub user: &'a UserProfile,
    pub pool: &'a [UserProfile],
    pub k: usize,
    pub exclude_ids: &'a BTreeSet<String>,
}

/// User recommendation strategy
pub trait RecommendStrategy: Send + Sync {
    fn recommend(&self, request: &RecommendRequest<'_>) -> StrategyOutcome;
    fn source(&self) -> MatchSource;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecommendation {
    pub user_id: String,
    pub score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecommendations {
    pub user_id: String,
    pub source: MatchSource,
    pub recommendations: Vec<UserRecommendation>,
    pub degraded: Vec<DegradedReason>,
}

pub struct RecommendLayer {
    strategies: Vec<Box<dyn RecommendStrategy>>,
    scorer: CompatibilityScorer,
}

impl RecommendLayer {
    pub fn new(index: Arc<SimilarityIndex>, fallback: RuleBasedMatcher) -> Self {
        let strategies: Vec<Box<dyn RecommendStrategy>> = vec![
            Box::new(SimilarityIndexStrategy::new(index)),
            Box::new(RuleBasedStrategy::new(fallback)),
        ];

        Self {
            strategies,
            scorer: CompatibilityScorer::new(),
        }
    }

    pub fn recommend(
        &self,
        user: &UserProfile,
        pool: &[UserProfile],
        k: usize,
        exclude_ids: &BTreeSet<String>,
    ) -> UserRecommendations {
        let request = RecommendRequest {
            user,
            pool,
            k,
            exclude_ids,
        };
        let mut degraded = Vec::new();

        for strategy in &self.strategies {
            match strategy.recommend(&request) {
                StrategyOutcome::Ranked { neighbors, notes } => {
                    degraded.extend(notes);
                    let recommendations = self.enrich(user, pool, neighbors);

                    info!(
                        user_id = %user.id,
                        source = strategy.source().as_str(),
                        pool_size = pool.len(),
                        returned = recommendations.len(),
                        degraded = degraded.len(),
                        "User recommendations completed"
                    );

                    return UserRecommendations {
                        user_id: user.id.clone(),
                        source: strategy.source(),
                        recommendations,
                        degraded,
                    };
                }
                StrategyOutcome::Unavailable(reason) => {
                    debug!(
                        user_id = %user.id,
                        source = strategy.source().as_str(),
                        reason = reason.as_str(),
                        "Recommendation strategy unavailable"
                    );
                    degraded.push(reason);
                }
            }
        }

        // The rule-based strategy never reports itself unavailable.
        UserRecommendations {
            user_id: user.id.clone(),
            source: MatchSource::RuleBased,
            recommendations: Vec::new(),
            degraded,
        }
    }

    fn enrich(
        &self,
        user: &UserProfile,
        pool: &[UserProfile],
        neighbors: Vec<Neighbor>,
    ) -> Vec<UserRecommendation> {
        neighbors
            .into_iter()
            .map(|n| {
                let match_reasons = pool
                    .iter()
                    .find(|c| c.id == n.id)
                    .map(|c| self.scorer.match_reasons(user, c))
                    .unwrap_or_default();
                UserRecommendation {
                    user_id: n.id,
                    score: n.similarity,
                    match_reasons,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcademicLevel;

    fn learner(id: &str, field: &str, interests: &[&str]) -> UserProfile {
        let mut user = UserProfile::new(id, AcademicLevel::Graduate, field);
        user.skills.interests = interests.iter().map(|s| s.to_string()).collect();
        user
    }

    fn pool() -> Vec<UserProfile> {
        vec![
            learner("a", "Physics", &["optics"]),
            learner("b", "Physics", &["optics", "lasers"]),
            learner("c", "History", &[]),
            learner("d", "Mathematics", &["topology"]),
        ]
    }

    #[test]
    fn test_untrained_index_falls_back_to_rules() {
        let index = Arc::new(SimilarityIndex::new(3));
        let layer = RecommendLayer::new(index, RuleBasedMatcher::default());
        let me = learner("me", "Physics", &["optics"]);

        let result = layer.recommend(&me, &pool(), 2, &BTreeSet::new());
        assert_eq!(result.source, MatchSource::RuleBased);
        assert_eq!(result.degraded, vec![DegradedReason::IndexUntrained]);
        let ids: Vec<&str> = result.recommendations.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!result.recommendations[0].match_reasons.is_empty());
    }

    #[test]
    fn test_trained_index_restricted_to_pool() {
        let index = Arc::new(SimilarityIndex::new(3));
        index.train(&pool()).unwrap();
        let layer = RecommendLayer::new(index, RuleBasedMatcher::default());
        let me = learner("me", "Physics", &["optics"]);

        let mut candidates = pool();
        candidates.truncate(2);
        candidates.push(learner("stranger", "Physics", &["optics"]));

        let result = layer.recommend(&me, &candidates, 5, &BTreeSet::new());
        assert_eq!(result.source, MatchSource::SimilarityIndex);
        assert_eq!(result.degraded, vec![DegradedReason::NotInIndex]);
        let ids: BTreeSet<&str> = result.recommendations.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"].into_iter().collect());
    }
}
