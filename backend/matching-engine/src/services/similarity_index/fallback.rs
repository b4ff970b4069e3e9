use super::{sort_neighbors, Neighbor};
use crate::models::UserProfile;
use std::collections::BTreeSet;
use tracing::debug;

/// Rule-based neighbor ranking used while the index is untrained.
/// Reproducible from the user and the pool alone.
#[derive(Debug, Clone)]
pub struct RuleBasedMatcher {
    active_user_points: i64,
}

impl Default for RuleBasedMatcher {
    fn default() -> Self {
        Self {
            active_user_points: 100,
        }
    }
}

impl RuleBasedMatcher {
    pub fn new(active_user_points: i64) -> Self {
        Self { active_user_points }
    }

    pub fn rank(
        &self,
        user: &UserProfile,
        pool: &[UserProfile],
        k: usize,
        exclude_ids: &BTreeSet<String>,
    ) -> Vec<Neighbor> {
        let mut seen = BTreeSet::new();
        let mut ranked: Vec<Neighbor> = pool
            .iter()
            .filter(|c| c.id != user.id && !exclude_ids.contains(&c.id))
            .filter(|c| seen.insert(c.id.clone()))
            .filter_map(|c| {
                let score = self.score(user, c);
                (score > 0.0).then(|| Neighbor {
                    id: c.id.clone(),
                    similarity: score,
                })
            })
            .collect();

        sort_neighbors(&mut ranked);
        ranked.truncate(k);

        debug!(
            user_id = %user.id,
            pool_size = pool.len(),
            returned = ranked.len(),
            "Rule-based ranking completed"
        );

        ranked
    }

    pub fn score(&self, user: &UserProfile, candidate: &UserProfile) -> f64 {
        let overlap = user
            .skills
            .interests
            .intersection(&candidate.skills.interests)
            .count();
        let mut score = 0.4 * overlap as f64;

        let user_field = user.field_of_study.to_lowercase();
        let candidate_field = candidate.field_of_study.to_lowercase();
        if !user_field.is_empty() && !candidate_field.is_empty() && candidate_field.contains(&user_field) {
            score += 0.3;
        }

        score += match user.academic_level.distance(candidate.academic_level) {
            0 => 0.2,
            1 => 0.1,
            _ => 0.0,
        };

        if candidate.points > self.active_user_points {
            score += 0.1;
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcademicLevel;

    fn with_interests(id: &str, level: AcademicLevel, field: &str, interests: &[&str]) -> UserProfile {
        let mut user = UserProfile::new(id, level, field);
        user.skills.interests = interests.iter().map(|s| s.to_string()).collect();
        user
    }

    #[test]
    fn test_rule_score_components() {
        let matcher = RuleBasedMatcher::default();
        let me = with_interests("me", AcademicLevel::Graduate, "Physics", &["optics", "lasers"]);
        let mut other = with_interests("o", AcademicLevel::Phd, "Applied Physics", &["optics"]);
        other.points = 150;

        // 0.4 overlap + 0.3 field + 0.1 adjacent level + 0.1 active
        assert!((matcher.score(&me, &other) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_rank_drops_zero_and_breaks_ties_by_id() {
        let matcher = RuleBasedMatcher::default();
        let me = with_interests("me", AcademicLevel::Undergraduate, "Biology", &["cells"]);
        let pool = vec![
            me.clone(),
            with_interests("zeta", AcademicLevel::Undergraduate, "History", &[]),
            with_interests("alpha", AcademicLevel::Undergraduate, "History", &[]),
            with_interests("far", AcademicLevel::Postdoc, "History", &[]),
            with_interests("best", AcademicLevel::Graduate, "Marine Biology", &["cells"]),
        ];

        let ranked = matcher.rank(&me, &pool, 10, &BTreeSet::new());
        let ids: Vec<&str> = ranked.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "alpha", "zeta"]);

        let again = matcher.rank(&me, &pool, 10, &BTreeSet::new());
        assert_eq!(ranked, again);
    }
}
