use super::CompatibilityScorer;
use crate::models::UserProfile;
use crate::utils::round_to;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CompatibilityFactors {
    pub interest_overlap: f64,
    pub level_compatibility: f64,
    pub field_similarity: f64,
    pub complementary_skills: f64,
    pub activity_level_match: f64,
}

impl CompatibilityFactors {
    fn weighted(&self) -> f64 {
        0.3 * self.interest_overlap
            + 0.2 * self.level_compatibility
            + 0.2 * self.field_similarity
            + 0.2 * self.complementary_skills
            + 0.1 * self.activity_level_match
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchSuccessPrediction {
    pub success_probability: f64,
    pub compatibility_score: f64,
    pub factors: CompatibilityFactors,
    pub recommendation: String,
}

impl CompatibilityScorer {
    /// Heuristic likelihood that two learners will work well together.
    pub fn predict_match_success(&self, a: &UserProfile, b: &UserProfile) -> MatchSuccessPrediction {
        let mut factors = CompatibilityFactors::default();

        let (ia, ib) = (&a.skills.interests, &b.skills.interests);
        if !ia.is_empty() && !ib.is_empty() {
            let overlap = ia.intersection(ib).count() as f64;
            factors.interest_overlap = overlap / ia.len().max(ib.len()) as f64;
        }

        let level_gap = f64::from(a.academic_level.distance(b.academic_level));
        factors.level_compatibility = (1.0 - 0.3 * level_gap).max(0.0);

        let (fa, fb) = (a.field_of_study.to_lowercase(), b.field_of_study.to_lowercase());
        if !fa.is_empty() && !fb.is_empty() {
            factors.field_similarity = if fa == fb {
                1.0
            } else if fa.contains(&fb) || fb.contains(&fa) {
                0.5
            } else {
                0.0
            };
        }

        let a_helps_b = a.skills.strengths.intersection(&b.skills.weaknesses);
        let b_helps_a = b.skills.strengths.intersection(&a.skills.weaknesses);
        let mutual: std::collections::BTreeSet<&String> = a_helps_b.chain(b_helps_a).collect();
        factors.complementary_skills = (0.25 * mutual.len() as f64).min(1.0);

        if a.points > 0 && b.points > 0 {
            factors.activity_level_match =
                a.points.min(b.points) as f64 / a.points.max(b.points) as f64;
        }

        let score = factors.weighted();
        let probability = (score * 1.2).min(1.0);

        let recommendation = if probability > 0.7 {
            "Highly recommended"
        } else if probability > 0.5 {
            "Recommended"
        } else if probability > 0.3 {
            "Moderate potential"
        } else {
            "Low compatibility"
        };

        MatchSuccessPrediction {
            success_probability: round_to(probability, 3),
            compatibility_score: round_to(score, 3),
            factors,
            recommendation: recommendation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcademicLevel;

    #[test]
    fn test_strong_pair_is_highly_recommended() {
        let scorer = CompatibilityScorer::new();
        let mut a = UserProfile::new("a", AcademicLevel::Graduate, "Physics");
        a.skills.interests = ["optics", "lasers"].iter().map(|s| s.to_string()).collect();
        a.skills.strengths = ["calculus"].iter().map(|s| s.to_string()).collect();
        a.skills.weaknesses = ["python"].iter().map(|s| s.to_string()).collect();
        a.points = 200;
        let mut b = a.clone();
        b.id = "b".to_string();
        b.skills.strengths = ["python"].iter().map(|s| s.to_string()).collect();
        b.skills.weaknesses = ["calculus"].iter().map(|s| s.to_string()).collect();

        let prediction = scorer.predict_match_success(&a, &b);
        // 0.3 + 0.2 + 0.2 + 0.2*0.5 + 0.1 = 0.9
        assert!((prediction.compatibility_score - 0.9).abs() < 1e-9);
        assert_eq!(prediction.success_probability, 1.0);
        assert_eq!(prediction.recommendation, "Highly recommended");
    }

    #[test]
    fn test_distant_pair_is_low() {
        let scorer = CompatibilityScorer::new();
        let a = UserProfile::new("a", AcademicLevel::Undergraduate, "History");
        let b = UserProfile::new("b", AcademicLevel::Postdoc, "Chemistry");

        let prediction = scorer.predict_match_success(&a, &b);
        assert!((prediction.factors.level_compatibility - 0.1).abs() < 1e-9);
        assert_eq!(prediction.factors.field_similarity, 0.0);
        assert_eq!(prediction.recommendation, "Low compatibility");
    }
}
