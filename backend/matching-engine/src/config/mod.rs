use crate::error::{MatchingError, Result};
use crate::models::MatchType;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment prefix for every engine setting, e.g. `MATCHING_PEER_MIN_SCORE`.
pub const ENV_PREFIX: &str = "MATCHING_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Minimum overall compatibility for mentor/mentee candidates
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_mentor_min_score")]
    pub mentor_min_score: f64,
    /// Minimum overall compatibility for peer candidates
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_peer_min_score")]
    pub peer_min_score: f64,
    /// Minimum overall compatibility for study-partner candidates
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_study_partner_min_score")]
    pub study_partner_min_score: f64,
    /// Points above which a candidate counts as an active user in the fallback
    #[serde(default = "default_active_user_points")]
    pub active_user_points: i64,
    /// Smallest corpus the similarity index accepts
    #[validate(range(min = 2))]
    #[serde(default = "default_min_training_corpus")]
    pub min_training_corpus: usize,
    #[validate(range(min = 1))]
    #[serde(default = "default_topic_max_features")]
    pub topic_max_features: usize,
    #[validate(range(min = 1))]
    #[serde(default = "default_feedback_max_features")]
    pub feedback_max_features: usize,
    /// Keywords returned by topic keyword extraction
    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,
    /// Key phrases kept per feedback analysis
    #[serde(default = "default_key_phrase_count")]
    pub key_phrase_count: usize,
    /// Narrow the orchestration pool with per-match-type eligibility rules
    /// before scoring
    #[serde(default)]
    pub candidate_prefilter: bool,
}

fn default_mentor_min_score() -> f64 {
    0.3
}

fn default_peer_min_score() -> f64 {
    0.4
}

fn default_study_partner_min_score() -> f64 {
    0.3
}

fn default_active_user_points() -> i64 {
    100
}

fn default_min_training_corpus() -> usize {
    3
}

fn default_topic_max_features() -> usize {
    5000
}

fn default_feedback_max_features() -> usize {
    1000
}

fn default_keyword_count() -> usize {
    10
}

fn default_key_phrase_count() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mentor_min_score: default_mentor_min_score(),
            peer_min_score: default_peer_min_score(),
            study_partner_min_score: default_study_partner_min_score(),
            active_user_points: default_active_user_points(),
            min_training_corpus: default_min_training_corpus(),
            topic_max_features: default_topic_max_features(),
            feedback_max_features: default_feedback_max_features(),
            keyword_count: default_keyword_count(),
            key_phrase_count: default_key_phrase_count(),
            candidate_prefilter: false,
        }
    }
}

impl Config {
    /// Load from `MATCHING_*` environment variables (and `.env` if present).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = envy::prefixed(ENV_PREFIX).from_env()?;
        config
            .validate()
            .map_err(|e| MatchingError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Minimum overall score a candidate needs to survive orchestration.
    pub fn min_score_for(&self, match_type: MatchType) -> f64 {
        match match_type {
            MatchType::MentorMentee => self.mentor_min_score,
            MatchType::Peer => self.peer_min_score,
            MatchType::StudyPartner => self.study_partner_min_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_score_for(MatchType::MentorMentee), 0.3);
        assert_eq!(config.min_score_for(MatchType::Peer), 0.4);
        assert_eq!(config.min_score_for(MatchType::StudyPartner), 0.3);
        assert_eq!(config.active_user_points, 100);
        assert_eq!(config.min_training_corpus, 3);
        assert!(!config.candidate_prefilter);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("MATCHING_PEER_MIN_SCORE", "0.55");
        std::env::set_var("MATCHING_ACTIVE_USER_POINTS", "250");
        std::env::set_var("MATCHING_CANDIDATE_PREFILTER", "true");

        let config = Config::from_env().expect("config should load");
        assert!((config.peer_min_score - 0.55).abs() < 1e-12);
        assert_eq!(config.active_user_points, 250);
        assert_eq!(config.mentor_min_score, 0.3);
        assert!(config.candidate_prefilter);

        std::env::remove_var("MATCHING_PEER_MIN_SCORE");
        std::env::remove_var("MATCHING_ACTIVE_USER_POINTS");
        std::env::remove_var("MATCHING_CANDIDATE_PREFILTER");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_out_of_range_threshold() {
        std::env::set_var("MATCHING_MENTOR_MIN_SCORE", "1.5");

        let result = Config::from_env();
        assert!(matches!(result, Err(MatchingError::Config(_))));

        std::env::remove_var("MATCHING_MENTOR_MIN_SCORE");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unparseable_value() {
        std::env::set_var("MATCHING_MIN_TRAINING_CORPUS", "three");

        let result = Config::from_env();
        assert!(matches!(result, Err(MatchingError::Config(_))));

        std::env::remove_var("MATCHING_MIN_TRAINING_CORPUS");
    }
}
