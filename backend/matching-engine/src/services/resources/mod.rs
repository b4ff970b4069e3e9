// ============================================
// Resource Ranking (学习资源排序)
// ============================================
//
// score = 0.4 * |(interests ∪ weaknesses) ∩ topics|
//       + level bonus (0.3 exact / 0.2 adjacent difficulty)
//       + 0.2 * rating / 5
//       + 0.1 * popularity

pub mod content_index;
pub mod study_groups;

pub use content_index::{ContentIndexStats, ResourceContentIndex};
pub use study_groups::{RankedStudyGroup, StudyGroupRanker};

use crate::models::{Resource, UserProfile};
use crate::utils::normalize_score;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResource {
    pub resource_id: String,
    pub score: f64,
    pub matched_topics: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct ResourceWeights {
    pub topic_match: f64,
    pub exact_level_bonus: f64,
    pub adjacent_level_bonus: f64,
    pub rating: f64,
    pub popularity: f64,
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self {
            topic_match: 0.4,
            exact_level_bonus: 0.3,
            adjacent_level_bonus: 0.2,
            rating: 0.2,
            popularity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceRanker {
    weights: ResourceWeights,
}

impl ResourceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ResourceWeights) -> Self {
        Self { weights }
    }

    /// Top `k` resources, score desc then id asc.
    pub fn rank(&self, user: &UserProfile, resources: &[Resource], k: usize) -> Vec<RankedResource> {
        let mut ranked: Vec<RankedResource> = resources
            .iter()
            .map(|resource| RankedResource {
                resource_id: resource.id.clone(),
                score: self.score(user, resource),
                matched_topics: matched_topics(user, resource),
                explanation: self.explain(user, resource),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        ranked.truncate(k);

        info!(
            user_id = %user.id,
            input_count = resources.len(),
            output_count = ranked.len(),
            "Resource ranking completed"
        );

        ranked
    }

    pub fn score(&self, user: &UserProfile, resource: &Resource) -> f64 {
        let topic_hits = matched_topics(user, resource).len() as f64;

        let expected = user.academic_level.expected_difficulty().ordinal();
        let level_bonus = match resource.difficulty_level.ordinal().abs_diff(expected) {
            0 => self.weights.exact_level_bonus,
            1 => self.weights.adjacent_level_bonus,
            _ => 0.0,
        };

        let rating = normalize_score(resource.rating, 0.0, 5.0);
        let popularity = resource.popularity.clamp(0.0, 1.0);

        self.weights.topic_match * topic_hits
            + level_bonus
            + self.weights.rating * rating
            + self.weights.popularity * popularity
    }

    /// One-sentence reason a resource was suggested.
    pub fn explain(&self, user: &UserProfile, resource: &Resource) -> String {
        let mut parts = Vec::new();

        let interests: Vec<&str> = user
            .skills
            .interests
            .intersection(&resource.topics)
            .take(2)
            .map(String::as_str)
            .collect();
        if !interests.is_empty() {
            parts.push(format!("matches your interest in {}", interests.join(", ")));
        }

        let gaps: Vec<&str> = user
            .skills
            .weaknesses
            .intersection(&resource.topics)
            .take(2)
            .map(String::as_str)
            .collect();
        if !gaps.is_empty() {
            parts.push(format!("helps strengthen {}", gaps.join(", ")));
        }

        if resource.difficulty_level == user.academic_level.expected_difficulty() {
            parts.push(format!(
                "is appropriate for {} level",
                user.academic_level.as_str()
            ));
        }

        if resource.rating >= 4.0 {
            parts.push("is highly rated by other learners".to_string());
        }

        if parts.is_empty() {
            "Good match for your learning goals".to_string()
        } else {
            format!("Recommended because it {}", parts.join(" and "))
        }
    }
}

fn matched_topics(user: &UserProfile, resource: &Resource) -> Vec<String> {
    let wanted: BTreeSet<&String> = user
        .skills
        .interests
        .iter()
        .chain(user.skills.weaknesses.iter())
        .collect();
    resource
        .topics
        .iter()
        .filter(|t| wanted.contains(t))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicLevel, DifficultyLevel};

    fn topics(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resource(id: &str, t: &[&str], difficulty: DifficultyLevel, rating: f64, popularity: f64) -> Resource {
        Resource {
            id: id.to_string(),
            title: None,
            topics: topics(t),
            difficulty_level: difficulty,
            rating,
            popularity,
        }
    }

    fn student() -> UserProfile {
        let mut user = UserProfile::new("s1", AcademicLevel::Graduate, "Mathematics");
        user.skills.interests = topics(&["algebra"]);
        user.skills.weaknesses = topics(&["statistics"]);
        user
    }

    #[test]
    fn test_topic_overlap_dominates_rating() {
        let ranker = ResourceRanker::new();
        let resources = vec![
            resource("popular", &["poetry"], DifficultyLevel::Intermediate, 5.0, 1.0),
            resource("relevant", &["algebra", "statistics"], DifficultyLevel::Intermediate, 0.0, 0.0),
        ];

        let ranked = ranker.rank(&student(), &resources, 2);
        assert_eq!(ranked[0].resource_id, "relevant");
        assert_eq!(ranked[0].matched_topics, vec!["algebra", "statistics"]);
        assert!((ranked[0].score - 1.1).abs() < 1e-9);
        assert!((ranked[1].score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_level_bonus() {
        let ranker = ResourceRanker::new();
        let user = student();
        let exact = ranker.score(&user, &resource("r", &[], DifficultyLevel::Intermediate, 0.0, 0.0));
        let adjacent = ranker.score(&user, &resource("r", &[], DifficultyLevel::Advanced, 0.0, 0.0));
        assert!((exact - 0.3).abs() < 1e-12);
        assert!((adjacent - 0.2).abs() < 1e-12);

        let undergrad = UserProfile::new("u", AcademicLevel::Undergraduate, "");
        let far = ranker.score(&undergrad, &resource("r", &[], DifficultyLevel::Advanced, 0.0, 0.0));
        assert_eq!(far, 0.0);
    }

    #[test]
    fn test_ties_break_by_id() {
        let ranker = ResourceRanker::new();
        let resources = vec![
            resource("b", &[], DifficultyLevel::Beginner, 3.0, 0.5),
            resource("a", &[], DifficultyLevel::Beginner, 3.0, 0.5),
        ];
        let ranked = ranker.rank(&student(), &resources, 5);
        assert_eq!(ranked[0].resource_id, "a");
        assert_eq!(ranked[1].resource_id, "b");
    }

    #[test]
    fn test_explanation() {
        let ranker = ResourceRanker::new();
        let r = resource("r", &["algebra", "statistics"], DifficultyLevel::Intermediate, 4.5, 0.2);
        assert_eq!(
            ranker.explain(&student(), &r),
            "Recommended because it matches your interest in algebra and helps strengthen \
             statistics and is appropriate for graduate level and is highly rated by other learners"
        );

        let plain = resource("p", &["poetry"], DifficultyLevel::Beginner, 1.0, 0.0);
        assert_eq!(ranker.explain(&student(), &plain), "Good match for your learning goals");
    }
}
