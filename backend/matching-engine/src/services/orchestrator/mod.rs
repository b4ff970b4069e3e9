// ============================================
// Match Orchestration (匹配编排)
// ============================================
//
// 0. Optional eligibility prefilter per match type
// 1. Compatibility-score every candidate for the match type (self excluded)
// 2. Keep candidates strictly above the match type's minimum overall score
// 3. Trained index: survivors ordered by similarity, then fill from the
//    compatibility ranking up to k. Untrained: compatibility ranking only.

use crate::config::Config;
use crate::models::{DegradedReason, MatchScore, MatchSource, MatchType, UserProfile};
use crate::services::compatibility::CompatibilityScorer;
use crate::services::similarity_index::SimilarityIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratedMatch {
    pub user_id: String,
    pub score: MatchScore,
    /// Set for entries ranked by the similarity index
    pub similarity: Option<f64>,
    pub source: MatchSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratedMatches {
    pub user_id: String,
    pub match_type: MatchType,
    pub matches: Vec<OrchestratedMatch>,
    /// Removed by the eligibility prefilter before scoring
    pub candidates_filtered: usize,
    pub candidates_scored: usize,
    pub candidates_dropped: usize,
    pub degraded: Vec<DegradedReason>,
}

/// Minimum overall score per match type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchThresholds {
    pub mentor_mentee: f64,
    pub peer: f64,
    pub study_partner: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MatchThresholds {
    fn from(config: &Config) -> Self {
        Self {
            mentor_mentee: config.min_score_for(MatchType::MentorMentee),
            peer: config.min_score_for(MatchType::Peer),
            study_partner: config.min_score_for(MatchType::StudyPartner),
        }
    }
}

impl MatchThresholds {
    pub fn for_type(&self, match_type: MatchType) -> f64 {
        match match_type {
            MatchType::MentorMentee => self.mentor_mentee,
            MatchType::Peer => self.peer,
            MatchType::StudyPartner => self.study_partner,
        }
    }
}

pub struct MatchOrchestrator {
    index: Arc<SimilarityIndex>,
    scorer: CompatibilityScorer,
    thresholds: MatchThresholds,
    prefilter: bool,
}

impl MatchOrchestrator {
    pub fn new(index: Arc<SimilarityIndex>, thresholds: MatchThresholds) -> Self {
        Self {
            index,
            scorer: CompatibilityScorer::new(),
            thresholds,
            prefilter: false,
        }
    }

    pub fn with_prefilter(mut self, enabled: bool) -> Self {
        self.prefilter = enabled;
        self
    }

    pub fn orchestrate(
        &self,
        user: &UserProfile,
        match_type: MatchType,
        pool: &[UserProfile],
        k: usize,
    ) -> OrchestratedMatches {
        let min_score = self.thresholds.for_type(match_type);
        let mut degraded = Vec::new();

        // Step 0: distinct candidates, first occurrence of each id wins
        let mut seen: HashSet<&str> = HashSet::new();
        let distinct: Vec<&UserProfile> = pool
            .iter()
            .filter(|c| c.id != user.id && seen.insert(c.id.as_str()))
            .collect();
        let distinct_count = distinct.len();
        let eligible: Vec<&UserProfile> = if self.prefilter {
            distinct
                .into_iter()
                .filter(|c| is_eligible(user, c, match_type))
                .collect()
        } else {
            distinct
        };
        let candidates_filtered = distinct_count - eligible.len();

        // Step 1: score
        let scored: Vec<(&UserProfile, MatchScore)> = eligible
            .into_iter()
            .map(|c| (c, self.scorer.score(user, c, match_type)))
            .collect();
        let candidates_scored = scored.len();

        // Step 2: threshold
        let mut survivors: Vec<(&UserProfile, MatchScore)> = scored
            .into_iter()
            .filter(|(_, score)| score.overall > min_score)
            .collect();
        let candidates_dropped = candidates_scored - survivors.len();

        survivors.sort_by(|a, b| {
            b.1.overall
                .partial_cmp(&a.1.overall)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        // Step 3: similarity ranking, then compatibility fill
        let mut matches: Vec<OrchestratedMatch> = Vec::with_capacity(k.min(survivors.len()));
        let mut taken: HashSet<String> = HashSet::new();

        if self.index.is_trained() {
            let by_id: HashMap<&str, MatchScore> = survivors
                .iter()
                .map(|(c, score)| (c.id.as_str(), *score))
                .collect();

            match self.index.query(user, usize::MAX, &BTreeSet::new()) {
                Ok(neighbors) => {
                    for neighbor in neighbors {
                        if matches.len() >= k {
                            break;
                        }
                        if let Some(score) = by_id.get(neighbor.id.as_str()) {
                            taken.insert(neighbor.id.clone());
                            matches.push(OrchestratedMatch {
                                user_id: neighbor.id,
                                score: *score,
                                similarity: Some(neighbor.similarity),
                                source: MatchSource::SimilarityIndex,
                            });
                        }
                    }
                }
                Err(e) => {
                    debug!(error = %e, reason = DegradedReason::IndexUntrained.as_str(), "Similarity ranking skipped");
                    degraded.push(DegradedReason::IndexUntrained);
                }
            }
        } else {
            debug!(
                user_id = %user.id,
                reason = DegradedReason::IndexUntrained.as_str(),
                "Similarity ranking skipped"
            );
            degraded.push(DegradedReason::IndexUntrained);
        }

        for (candidate, score) in &survivors {
            if matches.len() >= k {
                break;
            }
            if taken.insert(candidate.id.clone()) {
                matches.push(OrchestratedMatch {
                    user_id: candidate.id.clone(),
                    score: *score,
                    similarity: None,
                    source: MatchSource::Compatibility,
                });
            }
        }

        info!(
            user_id = %user.id,
            match_type = match_type.as_str(),
            candidates_filtered = candidates_filtered,
            candidates_scored = candidates_scored,
            candidates_dropped = candidates_dropped,
            output_count = matches.len(),
            "Match orchestration completed"
        );

        OrchestratedMatches {
            user_id: user.id.clone(),
            match_type,
            matches,
            candidates_filtered,
            candidates_scored,
            candidates_dropped,
            degraded,
        }
    }
}

/// Eligibility rules applied before scoring when the prefilter is enabled:
/// mentors must cover one of the user's weaknesses, peers share the academic
/// level and some interest or skill exchange, study partners share the field.
fn is_eligible(user: &UserProfile, candidate: &UserProfile, match_type: MatchType) -> bool {
    let (mine, theirs) = (&user.skills, &candidate.skills);
    match match_type {
        MatchType::MentorMentee => !theirs.strengths.is_disjoint(&mine.weaknesses),
        MatchType::Peer => {
            user.academic_level == candidate.academic_level
                && (!theirs.interests.is_disjoint(&mine.interests)
                    || !theirs.strengths.is_disjoint(&mine.weaknesses)
                    || !theirs.weaknesses.is_disjoint(&mine.strengths))
        }
        MatchType::StudyPartner => candidate
            .field_of_study
            .to_lowercase()
            .contains(&user.field_of_study.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicLevel, LearningPreference};

    fn user(id: &str, interests: &[&str], weaknesses: &[&str], strengths: &[&str]) -> UserProfile {
        let mut u = UserProfile::new(id, AcademicLevel::Graduate, "Computer Science");
        u.skills.interests = interests.iter().map(|s| s.to_string()).collect();
        u.skills.weaknesses = weaknesses.iter().map(|s| s.to_string()).collect();
        u.skills.strengths = strengths.iter().map(|s| s.to_string()).collect();
        u.learning_preferences.insert(LearningPreference::Visual);
        u
    }

    fn pool() -> Vec<UserProfile> {
        vec![
            user("a", &["ml"], &[], &["stats", "sql"]),
            user("b", &["ml"], &[], &["stats"]),
            user("c", &["poetry"], &[], &["drama"]),
            user("d", &["ml"], &[], &["sql"]),
        ]
    }

    fn me() -> UserProfile {
        user("me", &["ml"], &["stats", "sql"], &[])
    }

    #[test]
    fn test_untrained_uses_compatibility_only() {
        let orchestrator = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), MatchThresholds::default());
        let result = orchestrator.orchestrate(&me(), MatchType::MentorMentee, &pool(), 10);

        assert_eq!(result.degraded, vec![DegradedReason::IndexUntrained]);
        assert!(result.matches.iter().all(|m| m.source == MatchSource::Compatibility));
        assert!(result.matches.iter().all(|m| m.similarity.is_none()));
        assert_eq!(result.matches[0].user_id, "a");
        // overall desc
        assert!(result
            .matches
            .windows(2)
            .all(|w| w[0].score.overall >= w[1].score.overall));
    }

    #[test]
    fn test_threshold_drops_candidates() {
        let strict = MatchThresholds {
            mentor_mentee: 0.99,
            peer: 0.99,
            study_partner: 0.99,
        };
        let orchestrator = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), strict);
        let result = orchestrator.orchestrate(&me(), MatchType::MentorMentee, &pool(), 10);

        assert!(result.matches.is_empty());
        assert_eq!(result.candidates_scored, 4);
        assert_eq!(result.candidates_dropped, 4);
    }

    #[test]
    fn test_candidate_at_threshold_is_dropped() {
        let orchestrator = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), MatchThresholds::default());
        let b_score = orchestrator.scorer.score(&me(), &pool()[1], MatchType::MentorMentee);
        let exact = MatchThresholds {
            mentor_mentee: b_score.overall,
            ..MatchThresholds::default()
        };
        let orchestrator = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), exact);
        let result = orchestrator.orchestrate(&me(), MatchType::MentorMentee, &pool(), 10);

        assert!(result.matches.iter().all(|m| m.user_id != "b"));
        assert!(result.matches.iter().all(|m| m.score.overall > b_score.overall));
    }

    #[test]
    fn test_prefilter_applies_eligibility_rules() {
        let lenient = MatchThresholds {
            mentor_mentee: 0.0,
            peer: 0.0,
            study_partner: 0.0,
        };
        let unfiltered = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), lenient);
        let filtered = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), lenient).with_prefilter(true);

        // "c" covers none of the mentee's weaknesses
        let result = filtered.orchestrate(&me(), MatchType::MentorMentee, &pool(), 10);
        assert_eq!(result.candidates_filtered, 1);
        assert_eq!(result.candidates_scored, 3);
        assert!(result.matches.iter().all(|m| m.user_id != "c"));
        assert_eq!(
            unfiltered.orchestrate(&me(), MatchType::MentorMentee, &pool(), 10).candidates_filtered,
            0
        );

        // no weaknesses: nobody can mentor
        let mut confident = me();
        confident.skills.weaknesses.clear();
        let result = filtered.orchestrate(&confident, MatchType::MentorMentee, &pool(), 10);
        assert!(result.matches.is_empty());
        assert_eq!(result.candidates_filtered, 4);

        // peers need the same level
        let mut data = pool();
        data[0].academic_level = AcademicLevel::Phd;
        let result = filtered.orchestrate(&me(), MatchType::Peer, &data, 10);
        assert!(result.matches.iter().all(|m| m.user_id != "a"));
        assert!(result.matches.iter().any(|m| m.user_id == "b"));

        // study partners need a matching field
        data[1].field_of_study = "History".to_string();
        let result = filtered.orchestrate(&me(), MatchType::StudyPartner, &data, 10);
        assert!(result.matches.iter().all(|m| m.user_id != "b"));
        assert_eq!(result.candidates_filtered, 1);
    }

    #[test]
    fn test_trained_index_ranks_first_then_fills() {
        let index = Arc::new(SimilarityIndex::new(3));
        // "d" is not part of the trained corpus
        let data = pool();
        index.train(&data[..3]).unwrap();

        let lenient = MatchThresholds {
            mentor_mentee: 0.0,
            peer: 0.0,
            study_partner: 0.0,
        };
        let orchestrator = MatchOrchestrator::new(index, lenient);
        let result = orchestrator.orchestrate(&me(), MatchType::MentorMentee, &data, 10);

        assert!(result.degraded.is_empty());
        assert_eq!(result.matches.len(), 4);
        assert!(result.matches[..3]
            .iter()
            .all(|m| m.source == MatchSource::SimilarityIndex && m.similarity.is_some()));
        assert_eq!(result.matches[3].user_id, "d");
        assert_eq!(result.matches[3].source, MatchSource::Compatibility);

        let ids: HashSet<&str> = result.matches.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_excludes_self_and_duplicates() {
        let orchestrator = MatchOrchestrator::new(Arc::new(SimilarityIndex::new(3)), MatchThresholds {
            mentor_mentee: 0.0,
            peer: 0.0,
            study_partner: 0.0,
        });
        let mut data = pool();
        data.push(me());
        data.push(pool()[0].clone());

        let result = orchestrator.orchestrate(&me(), MatchType::Peer, &data, 2);
        assert_eq!(result.candidates_scored, 4);
        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| m.user_id != "me"));
    }
}
