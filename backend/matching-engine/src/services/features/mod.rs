// ============================================
// Feature Encoder
// ============================================
// Fixed-order numeric encoding of a learner profile, shared by the similarity
// index corpus and its queries.

use crate::models::{LearningPreference, UserProfile};

pub const FEATURE_DIM: usize = 11;

/// `[level, field, visual, auditory, kinesthetic, reading, |interests|,
/// |strengths|, |weaknesses|, points, level]`
pub type FeatureVector = [f64; FEATURE_DIM];

/// Field-of-study codes, matched in order by substring of the lowercase field.
const FIELD_CODES: &[(&str, f64)] = &[
    ("computer science", 1.0),
    ("mathematics", 2.0),
    ("physics", 3.0),
    ("chemistry", 4.0),
    ("biology", 5.0),
    ("psychology", 6.0),
    ("business", 7.0),
    ("engineering", 8.0),
    ("literature", 9.0),
    ("history", 10.0),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, user: &UserProfile) -> FeatureVector {
        let mut vector = [0.0; FEATURE_DIM];

        vector[0] = f64::from(user.academic_level.code());
        vector[1] = field_code(&user.field_of_study);

        for (offset, pref) in LearningPreference::ALL.iter().enumerate() {
            if user.learning_preferences.contains(pref) {
                vector[2 + offset] = 1.0;
            }
        }

        vector[6] = user.skills.interests.len() as f64;
        vector[7] = user.skills.strengths.len() as f64;
        vector[8] = user.skills.weaknesses.len() as f64;
        vector[9] = user.points as f64;
        vector[10] = user.level as f64;

        vector
    }
}

/// 0 when no known field is contained in `field`.
pub fn field_code(field: &str) -> f64 {
    let field = field.to_lowercase();
    FIELD_CODES
        .iter()
        .find(|(name, _)| field.contains(name))
        .map(|(_, code)| *code)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcademicLevel;

    fn sample_user() -> UserProfile {
        let mut user = UserProfile::new("u1", AcademicLevel::Phd, "Applied Physics");
        user.learning_preferences.insert(LearningPreference::Visual);
        user.learning_preferences.insert(LearningPreference::Reading);
        user.skills.interests.insert("optics".to_string());
        user.skills.interests.insert("lasers".to_string());
        user.skills.weaknesses.insert("statistics".to_string());
        user.points = 340;
        user.level = 4;
        user
    }

    #[test]
    fn test_encode_layout() {
        let vector = FeatureEncoder::new().encode(&sample_user());
        assert_eq!(
            vector,
            [3.0, 3.0, 1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 1.0, 340.0, 4.0]
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = FeatureEncoder::new();
        let user = sample_user();
        let a = encoder.encode(&user);
        let b = encoder.encode(&user);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_field_code_uses_first_table_match() {
        assert_eq!(field_code("Computer Science"), 1.0);
        assert_eq!(field_code("Biochemistry"), 4.0);
        assert_eq!(field_code("Music"), 0.0);
        assert_eq!(field_code(""), 0.0);
    }
}
