// ============================================
// Matching Engine
// ============================================
//
// Owns the configuration, scorers, rankers, the learner, resource and
// interaction indexes and both classifiers. Constructed once and shared by reference; every entry point
// validates its input records before any scoring runs.

use crate::config::Config;
use crate::error::{MatchingError, Result};
use crate::models::{ExpertProfile, MatchScore, MatchType, Resource, StudyGroup, UserProfile};
use crate::services::classifier::feedback::FeedbackTrainingReport;
use crate::services::classifier::{
    FeedbackAnalysis, FeedbackClassifier, FeedbackCorpus, FeedbackTrends, TopicClassifier,
    TopicCorpus, TopicPrediction, TrainingReport,
};
use crate::services::collaborative::{CollaborativeModel, CollaborativeStats, Interaction};
use crate::services::compatibility::{CompatibilityScorer, MatchSuccessPrediction};
use crate::services::experts::{ExpertExplanation, ExpertMatch, ExpertRanker};
use crate::services::orchestrator::{MatchOrchestrator, MatchThresholds, OrchestratedMatches};
use crate::services::recommend::{RecommendLayer, UserRecommendations};
use crate::services::resources::study_groups::{RankedStudyGroup, StudyGroupRanker};
use crate::services::resources::{ContentIndexStats, RankedResource, ResourceContentIndex, ResourceRanker};
use crate::services::similarity_index::{IndexStats, Neighbor, RuleBasedMatcher, SimilarityIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    pub similarity_index: IndexStats,
    pub content_model: ContentIndexStats,
    pub collaborative_model: CollaborativeStats,
    pub topic_classifier: Option<TrainingReport>,
    pub feedback_classifier: Option<FeedbackTrainingReport>,
}

pub struct MatchingEngine {
    config: Config,
    scorer: CompatibilityScorer,
    index: Arc<SimilarityIndex>,
    recommender: RecommendLayer,
    orchestrator: MatchOrchestrator,
    resources: ResourceRanker,
    content: ResourceContentIndex,
    collaborative: CollaborativeModel,
    study_groups: StudyGroupRanker,
    experts: ExpertRanker,
    topics: TopicClassifier,
    feedback: FeedbackClassifier,
}

fn validate_all<T: Validate>(records: &[T]) -> Result<()> {
    for record in records {
        record.validate()?;
    }
    Ok(())
}

impl MatchingEngine {
    /// Build the engine and train both classifiers from the bundled corpora.
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| MatchingError::Config(e.to_string()))?;

        let index = Arc::new(SimilarityIndex::new(config.min_training_corpus));
        let recommender = RecommendLayer::new(
            Arc::clone(&index),
            RuleBasedMatcher::new(config.active_user_points),
        );
        let orchestrator = MatchOrchestrator::new(Arc::clone(&index), MatchThresholds::from(&config))
            .with_prefilter(config.candidate_prefilter);

        let topics = TopicClassifier::bundled(config.topic_max_features)?;
        let feedback = FeedbackClassifier::bundled(config.feedback_max_features, config.key_phrase_count)?;

        info!(
            min_training_corpus = config.min_training_corpus,
            topic_max_features = config.topic_max_features,
            feedback_max_features = config.feedback_max_features,
            candidate_prefilter = config.candidate_prefilter,
            "Matching engine initialized"
        );

        Ok(Self {
            config,
            scorer: CompatibilityScorer::new(),
            index,
            recommender,
            orchestrator,
            resources: ResourceRanker::new(),
            content: ResourceContentIndex::new(),
            collaborative: CollaborativeModel::new(),
            study_groups: StudyGroupRanker::new(),
            experts: ExpertRanker::new(),
            topics,
            feedback,
        })
    }

    /// `Config::from_env()` followed by `new`.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn score_compatibility(
        &self,
        a: &UserProfile,
        b: &UserProfile,
        match_type: MatchType,
    ) -> Result<MatchScore> {
        a.validate()?;
        b.validate()?;
        Ok(self.scorer.score(a, b, match_type))
    }

    pub fn match_reasons(&self, user: &UserProfile, candidate: &UserProfile) -> Result<Vec<String>> {
        user.validate()?;
        candidate.validate()?;
        Ok(self.scorer.match_reasons(user, candidate))
    }

    pub fn predict_match_success(&self, a: &UserProfile, b: &UserProfile) -> Result<MatchSuccessPrediction> {
        a.validate()?;
        b.validate()?;
        Ok(self.scorer.predict_match_success(a, b))
    }

    pub fn recommend_users(
        &self,
        user: &UserProfile,
        pool: &[UserProfile],
        k: usize,
        exclude_ids: &BTreeSet<String>,
    ) -> Result<UserRecommendations> {
        user.validate()?;
        validate_all(pool)?;
        Ok(self.recommender.recommend(user, pool, k, exclude_ids))
    }

    pub fn recommend_resources(
        &self,
        user: &UserProfile,
        resources: &[Resource],
        k: usize,
    ) -> Result<Vec<RankedResource>> {
        user.validate()?;
        validate_all(resources)?;
        Ok(self.resources.rank(user, resources, k))
    }

    pub fn recommend_experts(
        &self,
        student: &UserProfile,
        experts: &[ExpertProfile],
        k: usize,
    ) -> Result<Vec<ExpertMatch>> {
        student.validate()?;
        validate_all(experts)?;
        Ok(self.experts.rank(student, experts, k))
    }

    pub fn explain_expert_match(&self, student: &UserProfile, expert: &ExpertProfile) -> Result<ExpertExplanation> {
        student.validate()?;
        expert.validate()?;
        Ok(self.experts.explain(student, expert))
    }

    pub fn recommend_study_groups(
        &self,
        user: &UserProfile,
        groups: &[StudyGroup],
        k: usize,
    ) -> Result<Vec<RankedStudyGroup>> {
        user.validate()?;
        validate_all(groups)?;
        Ok(self.study_groups.rank(user, groups, k))
    }

    pub fn classify_topic(&self, text: &str) -> TopicPrediction {
        self.topics.predict(text)
    }

    pub fn classify_topics(&self, texts: &[String]) -> Vec<TopicPrediction> {
        self.topics.predict_batch(texts)
    }

    pub fn extract_keywords(&self, text: &str) -> Vec<(String, f64)> {
        self.topics.extract_keywords(text, self.config.keyword_count)
    }

    pub fn suggest_related_topics(&self, topic: &str, n: usize) -> Vec<String> {
        self.topics.suggest_related(topic, n)
    }

    pub fn classify_feedback(&self, text: &str, rating: Option<f64>) -> FeedbackAnalysis {
        self.feedback.analyze(text, rating)
    }

    pub fn feedback_trends(&self, analyses: &[FeedbackAnalysis]) -> FeedbackTrends {
        self.feedback.trends(analyses)
    }

    /// `Ok(false)` when the corpus is too small; the previous index stays.
    pub fn train_similarity_index(&self, corpus: &[UserProfile]) -> Result<bool> {
        validate_all(corpus)?;
        match self.index.train(corpus) {
            Ok(_) => Ok(true),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Similarity index not retrained");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(false)` with fewer than three resources; the previous model stays.
    pub fn train_content_model(&self, resources: &[Resource]) -> Result<bool> {
        validate_all(resources)?;
        match self.content.train(resources) {
            Ok(_) => Ok(true),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Content model not retrained");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn similar_resources(&self, resource: &Resource, k: usize) -> Result<Vec<Neighbor>> {
        resource.validate()?;
        self.content.similar(resource, k)
    }

    /// `Ok(false)` with fewer than ten interactions; the previous model stays.
    pub fn train_collaborative_model(&self, interactions: &[Interaction]) -> Result<bool> {
        validate_all(interactions)?;
        match self.collaborative.train(interactions) {
            Ok(_) => Ok(true),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Collaborative model not retrained");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn similar_users_by_interactions(&self, user_id: &str, k: usize) -> Result<Vec<Neighbor>> {
        self.collaborative.similar_users(user_id, k)
    }

    pub fn retrain_topic_classifier(&self, corpus: &TopicCorpus) -> Result<TrainingReport> {
        self.topics.train(corpus)
    }

    pub fn retrain_feedback_classifier(&self, corpus: &FeedbackCorpus) -> Result<FeedbackTrainingReport> {
        self.feedback.train(corpus)
    }

    pub fn orchestrate(
        &self,
        user: &UserProfile,
        match_type: MatchType,
        pool: &[UserProfile],
        k: usize,
    ) -> Result<OrchestratedMatches> {
        user.validate()?;
        validate_all(pool)?;
        Ok(self.orchestrator.orchestrate(user, match_type, pool, k))
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            similarity_index: self.index.stats(),
            content_model: self.content.stats(),
            collaborative_model: self.collaborative.stats(),
            topic_classifier: self.topics.report(),
            feedback_classifier: self.feedback.report(),
        }
    }
}
