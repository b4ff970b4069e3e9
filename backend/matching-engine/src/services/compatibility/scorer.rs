use crate::models::{DegradedReason, MatchScore, MatchType, UserProfile};
use crate::services::text::tfidf_cosine;
use crate::utils::jaccard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

const NEUTRAL: f64 = 0.5;

/// Points gap under which two learners count as similarly experienced.
const SIMILAR_EXPERIENCE_POINTS: i64 = 200;

/// A score plus every neutral default that went into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCompatibility {
    pub score: MatchScore,
    pub degraded: Vec<DegradedReason>,
}

/// Stateless scorer; `user_a` is the requester (mentee in mentor flows),
/// `user_b` the candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityScorer;

impl CompatibilityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, user_a: &UserProfile, user_b: &UserProfile, match_type: MatchType) -> MatchScore {
        self.score_with_reasons(user_a, user_b, match_type).score
    }

    pub fn score_with_reasons(
        &self,
        user_a: &UserProfile,
        user_b: &UserProfile,
        match_type: MatchType,
    ) -> ScoredCompatibility {
        let mut degraded = Vec::new();

        let skill = self.skill(user_a, user_b, match_type, &mut degraded);
        let schedule = self.schedule(user_a, user_b, &mut degraded);
        let learning_style = self.learning_style(user_a, user_b, &mut degraded);
        let topic_relevance = self.topic_relevance(user_a, user_b, &mut degraded);

        let score = MatchScore::new(skill, schedule, learning_style, topic_relevance, match_type);

        debug!(
            user_a = %user_a.id,
            user_b = %user_b.id,
            match_type = match_type.as_str(),
            skill = score.skill,
            schedule = score.schedule,
            learning_style = score.learning_style,
            topic_relevance = score.topic_relevance,
            overall = score.overall,
            degraded = degraded.len(),
            "Compatibility score computed"
        );

        ScoredCompatibility { score, degraded }
    }

    fn skill(
        &self,
        a: &UserProfile,
        b: &UserProfile,
        match_type: MatchType,
        degraded: &mut Vec<DegradedReason>,
    ) -> f64 {
        match match_type {
            MatchType::MentorMentee => {
                let needs = &a.skills.weaknesses;
                if needs.is_empty() {
                    degraded.push(DegradedReason::MissingWeaknesses);
                    return 0.0;
                }
                let covered = b.skills.strengths.intersection(needs).count();
                covered as f64 / needs.len() as f64
            }
            MatchType::Peer => {
                let total_needs = a.skills.weaknesses.len() + b.skills.weaknesses.len();
                if total_needs == 0 {
                    degraded.push(DegradedReason::MissingWeaknesses);
                    return NEUTRAL;
                }
                let a_helps_b = a.skills.strengths.intersection(&b.skills.weaknesses).count();
                let b_helps_a = b.skills.strengths.intersection(&a.skills.weaknesses).count();
                (a_helps_b + b_helps_a) as f64 / total_needs as f64
            }
            MatchType::StudyPartner => match jaccard(&a.skills.interests, &b.skills.interests) {
                Some(overlap) => overlap,
                None => {
                    degraded.push(DegradedReason::MissingInterests);
                    0.0
                }
            },
        }
    }

    fn schedule(&self, a: &UserProfile, b: &UserProfile, degraded: &mut Vec<DegradedReason>) -> f64 {
        if !a.has_availability() || !b.has_availability() {
            degraded.push(DegradedReason::MissingAvailability);
            return NEUTRAL;
        }

        let mut common_days = 0usize;
        let mut total = 0.0;
        for (day, slots_a) in &a.availability {
            let Some(slots_b) = b.availability.get(day) else {
                continue;
            };
            common_days += 1;
            let widest = slots_a.len().max(slots_b.len());
            if widest > 0 {
                total += slots_a.intersection(slots_b).count() as f64 / widest as f64;
            }
        }

        if common_days == 0 {
            degraded.push(DegradedReason::NoCommonDays);
            return 0.0;
        }

        total / common_days as f64
    }

    fn learning_style(&self, a: &UserProfile, b: &UserProfile, degraded: &mut Vec<DegradedReason>) -> f64 {
        if a.learning_preferences.is_empty() || b.learning_preferences.is_empty() {
            degraded.push(DegradedReason::MissingLearningPreferences);
            return NEUTRAL;
        }
        jaccard(&a.learning_preferences, &b.learning_preferences).unwrap_or(NEUTRAL)
    }

    fn topic_relevance(&self, a: &UserProfile, b: &UserProfile, degraded: &mut Vec<DegradedReason>) -> f64 {
        match tfidf_cosine(&topic_text(a), &topic_text(b)) {
            Some(similarity) => similarity,
            None => {
                degraded.push(DegradedReason::EmptyTopicText);
                NEUTRAL
            }
        }
    }

    /// Human-readable reasons a candidate was suggested.
    pub fn match_reasons(&self, user: &UserProfile, candidate: &UserProfile) -> Vec<String> {
        let mut reasons = Vec::new();

        let shared: Vec<&String> = user
            .skills
            .interests
            .intersection(&candidate.skills.interests)
            .collect();
        match shared.len() {
            0 => {}
            1 => reasons.push(format!("Shared interest in {}", shared[0])),
            _ => reasons.push(format!(
                "Multiple shared interests: {}",
                join_first(&shared, 3)
            )),
        }

        if !user.field_of_study.is_empty()
            && user.field_of_study.eq_ignore_ascii_case(&candidate.field_of_study)
        {
            reasons.push(format!("Same field of study: {}", user.field_of_study));
        }

        if user.academic_level == candidate.academic_level {
            reasons.push(format!(
                "Same academic level: {}",
                user.academic_level.as_str()
            ));
        }

        let can_help: BTreeSet<&String> = user
            .skills
            .strengths
            .intersection(&candidate.skills.weaknesses)
            .collect();
        if !can_help.is_empty() {
            let can_help: Vec<&String> = can_help.into_iter().collect();
            reasons.push(format!("Can help with: {}", join_first(&can_help, 2)));
        }

        if (user.points - candidate.points).abs() < SIMILAR_EXPERIENCE_POINTS {
            reasons.push("Similar experience level".to_string());
        }

        if reasons.is_empty() {
            reasons.push("Good potential for collaboration".to_string());
        }

        reasons
    }
}

/// `field_of_study` followed by the interests, the text compared for topic relevance.
pub(crate) fn topic_text(user: &UserProfile) -> String {
    let mut text = user.field_of_study.clone();
    for interest in &user.skills.interests {
        text.push(' ');
        text.push_str(interest);
    }
    text
}

fn join_first(items: &[&String], n: usize) -> String {
    items
        .iter()
        .take(n)
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
