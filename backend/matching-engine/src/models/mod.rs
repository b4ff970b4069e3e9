use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AcademicLevel {
    #[default]
    Undergraduate,
    Graduate,
    Phd,
    Postdoc,
}

impl AcademicLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicLevel::Undergraduate => "undergraduate",
            AcademicLevel::Graduate => "graduate",
            AcademicLevel::Phd => "phd",
            AcademicLevel::Postdoc => "postdoc",
        }
    }

    /// Ordinal code used by the feature encoder and level-distance rules (1-4).
    pub fn code(&self) -> u8 {
        match self {
            AcademicLevel::Undergraduate => 1,
            AcademicLevel::Graduate => 2,
            AcademicLevel::Phd => 3,
            AcademicLevel::Postdoc => 4,
        }
    }

    /// Absolute distance between two levels on the 1-4 scale.
    pub fn distance(&self, other: AcademicLevel) -> u8 {
        self.code().abs_diff(other.code())
    }

    /// Resource difficulty a learner at this level is expected to work at.
    pub fn expected_difficulty(&self) -> DifficultyLevel {
        match self {
            AcademicLevel::Undergraduate => DifficultyLevel::Beginner,
            AcademicLevel::Graduate => DifficultyLevel::Intermediate,
            AcademicLevel::Phd | AcademicLevel::Postdoc => DifficultyLevel::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LearningPreference {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

impl LearningPreference {
    /// Encoder column order.
    pub const ALL: [LearningPreference; 4] = [
        LearningPreference::Visual,
        LearningPreference::Auditory,
        LearningPreference::Kinesthetic,
        LearningPreference::Reading,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            DifficultyLevel::Beginner => 1,
            DifficultyLevel::Intermediate => 2,
            DifficultyLevel::Advanced => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    MentorMentee,
    Peer,
    StudyPartner,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::MentorMentee => "mentor_mentee",
            MatchType::Peer => "peer",
            MatchType::StudyPartner => "study_partner",
        }
    }

    /// Component weights; each set sums to 1.
    pub fn weights(&self) -> ComponentWeights {
        match self {
            MatchType::MentorMentee => ComponentWeights {
                skill: 0.4,
                schedule: 0.2,
                learning_style: 0.2,
                topic_relevance: 0.2,
            },
            MatchType::Peer => ComponentWeights {
                skill: 0.3,
                schedule: 0.25,
                learning_style: 0.25,
                topic_relevance: 0.2,
            },
            MatchType::StudyPartner => ComponentWeights {
                skill: 0.25,
                schedule: 0.3,
                learning_style: 0.25,
                topic_relevance: 0.2,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComponentWeights {
    pub skill: f64,
    pub schedule: f64,
    pub learning_style: f64,
    pub topic_relevance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skills {
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub strengths: BTreeSet<String>,
    /// Topics the learner wants help with
    #[serde(default)]
    pub weaknesses: BTreeSet<String>,
}

/// Immutable learner snapshot supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[validate(length(min = 1))]
    pub id: String,
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub learning_preferences: BTreeSet<LearningPreference>,
    /// Day name -> time slot labels
    #[serde(default)]
    pub availability: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub skills: Skills,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub points: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub level: i64,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, academic_level: AcademicLevel, field_of_study: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            academic_level,
            field_of_study: field_of_study.into(),
            level: 1,
            ..Default::default()
        }
    }

    /// True when at least one day carries at least one slot.
    pub fn has_availability(&self) -> bool {
        self.availability.values().any(|slots| !slots.is_empty())
    }
}

pub(crate) fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("not_finite"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Resource {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    /// Average learner rating on a 0-5 scale
    #[validate(range(min = 0.0, max = 5.0), custom(function = "validate_finite"))]
    pub rating: f64,
    #[validate(range(min = 0.0, max = 1.0), custom(function = "validate_finite"))]
    pub popularity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExpertProfile {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub expertise_areas: BTreeSet<String>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub years_experience: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StudyGroup {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub member_ids: BTreeSet<String>,
    #[validate(range(min = 1))]
    #[serde(default = "default_max_members")]
    pub max_members: usize,
}

fn default_max_members() -> usize {
    6
}

/// Compatibility components in [0, 1] and their weighted sum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchScore {
    pub skill: f64,
    pub schedule: f64,
    pub learning_style: f64,
    pub topic_relevance: f64,
    pub overall: f64,
}

impl MatchScore {
    /// Clamp each component and derive `overall` from the match type weights.
    pub fn new(
        skill: f64,
        schedule: f64,
        learning_style: f64,
        topic_relevance: f64,
        match_type: MatchType,
    ) -> Self {
        let skill = skill.clamp(0.0, 1.0);
        let schedule = schedule.clamp(0.0, 1.0);
        let learning_style = learning_style.clamp(0.0, 1.0);
        let topic_relevance = topic_relevance.clamp(0.0, 1.0);

        let w = match_type.weights();
        let overall = w.skill * skill
            + w.schedule * schedule
            + w.learning_style * learning_style
            + w.topic_relevance * topic_relevance;

        Self {
            skill,
            schedule,
            learning_style,
            topic_relevance,
            overall,
        }
    }
}

/// Why a neutral default, fallback path, or ignored input was used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    IndexUntrained,
    InsufficientTrainingData,
    NotInIndex,
    EmptyText,
    NoKnownTerms,
    ModelUnavailable,
    MissingAvailability,
    MissingLearningPreferences,
    EmptyTopicText,
    NoCommonDays,
    MissingFieldOfStudy,
    MissingWeaknesses,
    MissingInterests,
    InvalidRatingIgnored,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::IndexUntrained => "index_untrained",
            DegradedReason::InsufficientTrainingData => "insufficient_training_data",
            DegradedReason::NotInIndex => "not_in_index",
            DegradedReason::EmptyText => "empty_text",
            DegradedReason::NoKnownTerms => "no_known_terms",
            DegradedReason::ModelUnavailable => "model_unavailable",
            DegradedReason::MissingAvailability => "missing_availability",
            DegradedReason::MissingLearningPreferences => "missing_learning_preferences",
            DegradedReason::EmptyTopicText => "empty_topic_text",
            DegradedReason::NoCommonDays => "no_common_days",
            DegradedReason::MissingFieldOfStudy => "missing_field_of_study",
            DegradedReason::MissingWeaknesses => "missing_weaknesses",
            DegradedReason::MissingInterests => "missing_interests",
            DegradedReason::InvalidRatingIgnored => "invalid_rating_ignored",
        }
    }
}

/// Which strategy produced a ranked entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    SimilarityIndex,
    RuleBased,
    Compatibility,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::SimilarityIndex => "similarity_index",
            MatchSource::RuleBased => "rule_based",
            MatchSource::Compatibility => "compatibility",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        for match_type in [MatchType::MentorMentee, MatchType::Peer, MatchType::StudyPartner] {
            let w = match_type.weights();
            let sum = w.skill + w.schedule + w.learning_style + w.topic_relevance;
            assert!((sum - 1.0).abs() < 1e-12, "{} weights sum to {}", match_type.as_str(), sum);
        }
    }

    #[test]
    fn test_match_score_clamps_components() {
        let score = MatchScore::new(1.4, -0.2, 0.5, 0.5, MatchType::Peer);
        assert_eq!(score.skill, 1.0);
        assert_eq!(score.schedule, 0.0);
        assert!((score.overall - (0.3 + 0.25 * 0.5 + 0.2 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_level_distance_and_expected_difficulty() {
        assert_eq!(AcademicLevel::Undergraduate.distance(AcademicLevel::Phd), 2);
        assert_eq!(AcademicLevel::Postdoc.distance(AcademicLevel::Phd), 1);
        assert_eq!(
            AcademicLevel::Postdoc.expected_difficulty(),
            DifficultyLevel::Advanced
        );
    }

    #[test]
    fn test_profile_validation() {
        let mut user = UserProfile::new("u1", AcademicLevel::Graduate, "Physics");
        assert!(user.validate().is_ok());

        user.points = -5;
        assert!(user.validate().is_err());

        user.points = 0;
        user.id.clear();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_resource_rejects_nan_rating() {
        let resource = Resource {
            id: "r1".to_string(),
            rating: f64::NAN,
            popularity: 0.5,
            ..Default::default()
        };
        assert!(resource.validate().is_err());

        let resource = Resource {
            id: "r1".to_string(),
            rating: 5.5,
            popularity: 0.5,
            ..Default::default()
        };
        assert!(resource.validate().is_err());
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let user: UserProfile = serde_json::from_str(
            r#"{"id": "u9", "academic_level": "phd", "skills": {"interests": ["ML"]}}"#,
        )
        .unwrap();
        assert_eq!(user.academic_level, AcademicLevel::Phd);
        assert!(user.skills.interests.contains("ML"));
        assert!(!user.has_availability());
    }

    #[test]
    fn test_profile_requires_academic_level() {
        let result = serde_json::from_str::<UserProfile>(r#"{"id": "u9", "field_of_study": "Physics"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&DegradedReason::InvalidRatingIgnored).unwrap();
        assert_eq!(json, "\"invalid_rating_ignored\"");
        assert_eq!(MatchSource::RuleBased.as_str(), "rule_based");
    }
}
