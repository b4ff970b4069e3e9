pub mod classifier;
pub mod collaborative;
pub mod compatibility;
pub mod experts;
pub mod features;
pub mod model_handle;
pub mod orchestrator;
pub mod recommend;
pub mod resources;
pub mod similarity_index;
pub mod text;

pub use classifier::{FeedbackClassifier, TopicClassifier};
pub use collaborative::{CollaborativeModel, Interaction};
pub use compatibility::CompatibilityScorer;
pub use experts::ExpertRanker;
pub use features::FeatureEncoder;
pub use model_handle::ModelHandle;
pub use orchestrator::MatchOrchestrator;
pub use recommend::RecommendLayer;
pub use resources::{ResourceContentIndex, ResourceRanker, StudyGroupRanker};
pub use similarity_index::{RuleBasedMatcher, SimilarityIndex};
