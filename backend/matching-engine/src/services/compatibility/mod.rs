// ============================================
// Compatibility Scoring (兼容性打分)
// ============================================
//
// Pairwise learner compatibility for the three match types:
// - skill: strengths covering weaknesses (or shared interests)
// - schedule: per-day slot overlap
// - learning_style: Jaccard of preferences
// - topic_relevance: TF-IDF cosine of field + interests
//
// Missing inputs fall back to neutral values and are reported, never errors.

pub mod scorer;
pub mod success;

pub use scorer::{CompatibilityScorer, ScoredCompatibility};
pub use success::{CompatibilityFactors, MatchSuccessPrediction};
