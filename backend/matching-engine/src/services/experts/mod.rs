// ============================================
// Expert Ranking (专家匹配)
// ============================================
//
// score = 0.40 * interest overlap (Jaccard of needs vs capabilities)
//       + 0.30 * text similarity (TF-IDF cosine of profile texts)
//       + 0.20 * field alignment
//       + 0.10 * experience compatibility

use crate::models::{AcademicLevel, DegradedReason, ExpertProfile, UserProfile};
use crate::services::text::tfidf_cosine;
use crate::utils::jaccard;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Fields considered adjacent for alignment scoring.
const RELATED_FIELDS: &[(&str, &[&str])] = &[
    (
        "computer science",
        &["software engineering", "data science", "ai", "machine learning"],
    ),
    ("mathematics", &["statistics", "data science", "physics"]),
    ("physics", &["engineering", "mathematics"]),
    ("biology", &["chemistry", "biotechnology", "medicine"]),
    ("chemistry", &["biology", "biochemistry"]),
    ("business", &["economics", "finance", "marketing"]),
];

/// Preferred years of expert experience per academic level (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceBands {
    pub undergraduate: (u32, u32),
    pub graduate: (u32, u32),
    pub phd: (u32, u32),
    pub postdoc: (u32, u32),
}

impl Default for ExperienceBands {
    fn default() -> Self {
        Self {
            undergraduate: (0, 5),
            graduate: (2, 10),
            phd: (5, 20),
            postdoc: (8, 30),
        }
    }
}

impl ExperienceBands {
    pub fn band(&self, level: AcademicLevel) -> (u32, u32) {
        match level {
            AcademicLevel::Undergraduate => self.undergraduate,
            AcademicLevel::Graduate => self.graduate,
            AcademicLevel::Phd => self.phd,
            AcademicLevel::Postdoc => self.postdoc,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExpertScoreBreakdown {
    pub interest_overlap: f64,
    pub text_similarity: f64,
    pub field_alignment: f64,
    pub experience_compatibility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpertMatch {
    pub expert_id: String,
    pub score: f64,
    pub breakdown: ExpertScoreBreakdown,
    /// Student interests the expert lists as expertise areas
    pub matched_interests: Vec<String>,
    pub degraded: Vec<DegradedReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpertExplanation {
    pub match_quality: String,
    pub common_interests: Vec<String>,
    pub expert_strengths: Vec<String>,
    pub field_compatibility: String,
    pub experience_level: String,
    pub recommendation_reason: String,
    /// Components that fell back to a default value
    pub degraded: Vec<DegradedReason>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpertRanker {
    bands: ExperienceBands,
}

impl ExpertRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bands(bands: ExperienceBands) -> Self {
        Self { bands }
    }

    pub fn rank(&self, student: &UserProfile, experts: &[ExpertProfile], k: usize) -> Vec<ExpertMatch> {
        let student_text = student_text(student);

        let mut matches: Vec<ExpertMatch> = experts
            .iter()
            .map(|expert| self.score_with_text(student, &student_text, expert))
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.expert_id.cmp(&b.expert_id))
        });
        matches.truncate(k);

        info!(
            student_id = %student.id,
            input_count = experts.len(),
            output_count = matches.len(),
            "Expert ranking completed"
        );

        matches
    }

    pub fn score(&self, student: &UserProfile, expert: &ExpertProfile) -> ExpertMatch {
        self.score_with_text(student, &student_text(student), expert)
    }

    fn score_with_text(&self, student: &UserProfile, student_text: &str, expert: &ExpertProfile) -> ExpertMatch {
        let (breakdown, degraded) = self.components(student, student_text, expert);

        let score = 0.40 * breakdown.interest_overlap
            + 0.30 * breakdown.text_similarity
            + 0.20 * breakdown.field_alignment
            + 0.10 * breakdown.experience_compatibility;

        debug!(
            student_id = %student.id,
            expert_id = %expert.id,
            interest_overlap = breakdown.interest_overlap,
            text_similarity = breakdown.text_similarity,
            field_alignment = breakdown.field_alignment,
            score = score,
            degraded = degraded.len(),
            "Expert score computed"
        );

        ExpertMatch {
            expert_id: expert.id.clone(),
            score,
            breakdown,
            matched_interests: common_interests(student, expert),
            degraded,
        }
    }

    /// Component scores plus the reason for every default taken.
    fn components(
        &self,
        student: &UserProfile,
        student_text: &str,
        expert: &ExpertProfile,
    ) -> (ExpertScoreBreakdown, Vec<DegradedReason>) {
        let mut degraded = Vec::new();

        let interest_overlap = interest_overlap(student, expert).unwrap_or_else(|| {
            degraded.push(DegradedReason::MissingInterests);
            0.0
        });
        let text_similarity = tfidf_cosine(student_text, &expert_text(expert)).unwrap_or_else(|| {
            degraded.push(DegradedReason::EmptyText);
            0.0
        });
        let field_alignment = field_alignment(&student.field_of_study, &expert.field_of_study).unwrap_or_else(|| {
            degraded.push(DegradedReason::MissingFieldOfStudy);
            0.5
        });
        let experience_compatibility = self.experience_compatibility(student.academic_level, expert.years_experience);

        let breakdown = ExpertScoreBreakdown {
            interest_overlap,
            text_similarity,
            field_alignment,
            experience_compatibility,
        };
        (breakdown, degraded)
    }

    /// 1.0 within the level's band, 0.7 below it, 0.9 above it.
    pub fn experience_compatibility(&self, level: AcademicLevel, years: u32) -> f64 {
        let (min, max) = self.bands.band(level);
        if years < min {
            0.7
        } else if years > max {
            0.9
        } else {
            1.0
        }
    }

    pub fn explain(&self, student: &UserProfile, expert: &ExpertProfile) -> ExpertExplanation {
        let (breakdown, degraded) = self.components(student, &student_text(student), expert);
        let interest = breakdown.interest_overlap;
        let field = breakdown.field_alignment;
        let common = common_interests(student, expert);

        let match_quality = if interest > 0.7 {
            "Excellent"
        } else if interest > 0.4 {
            "Good"
        } else {
            "Fair"
        };

        let field_compatibility = if field > 0.7 {
            "High"
        } else if field > 0.4 {
            "Medium"
        } else {
            "Low"
        };

        let recommendation_reason = if interest > 0.7 {
            format!(
                "Excellent match! You share {} key interests with this expert.",
                common.len()
            )
        } else if interest > 0.4 {
            format!(
                "Good match based on {} shared interests and field alignment.",
                common.len()
            )
        } else if field > 0.7 {
            "This expert works in your field and could provide valuable insights.".to_string()
        } else {
            "This expert has diverse expertise that could broaden your perspective.".to_string()
        };

        ExpertExplanation {
            match_quality: match_quality.to_string(),
            common_interests: common,
            expert_strengths: expert.expertise_areas.iter().cloned().collect(),
            field_compatibility: field_compatibility.to_string(),
            experience_level: format!("{} years", expert.years_experience),
            recommendation_reason,
            degraded,
        }
    }
}

/// Jaccard of the student's needs (interests ∪ weaknesses) and the expert's
/// capabilities (expertise ∪ interests ∪ strengths); `None` when either is empty.
fn interest_overlap(student: &UserProfile, expert: &ExpertProfile) -> Option<f64> {
    let needs: BTreeSet<&String> = student
        .skills
        .interests
        .iter()
        .chain(student.skills.weaknesses.iter())
        .collect();
    let capabilities: BTreeSet<&String> = expert
        .expertise_areas
        .iter()
        .chain(expert.skills.interests.iter())
        .chain(expert.skills.strengths.iter())
        .collect();

    if needs.is_empty() || capabilities.is_empty() {
        return None;
    }
    jaccard(&needs, &capabilities)
}

/// `None` when either field is missing.
fn field_alignment(student_field: &str, expert_field: &str) -> Option<f64> {
    let s = student_field.trim().to_lowercase();
    let e = expert_field.trim().to_lowercase();
    if s.is_empty() || e.is_empty() {
        return None;
    }

    if s == e {
        return Some(1.0);
    }
    if s.contains(&e) || e.contains(&s) {
        return Some(0.8);
    }

    for (field, related) in RELATED_FIELDS {
        if s.contains(field) && related.iter().any(|r| e.contains(r)) {
            return Some(0.6);
        }
        if e.contains(field) && related.iter().any(|r| s.contains(r)) {
            return Some(0.6);
        }
    }

    Some(0.3)
}

fn common_interests(student: &UserProfile, expert: &ExpertProfile) -> Vec<String> {
    student
        .skills
        .interests
        .intersection(&expert.expertise_areas)
        .cloned()
        .collect()
}

fn student_text(student: &UserProfile) -> String {
    let mut parts: Vec<&str> = student
        .skills
        .interests
        .iter()
        .chain(student.skills.weaknesses.iter())
        .map(String::as_str)
        .collect();
    parts.push(&student.field_of_study);
    if let Some(bio) = &student.bio {
        parts.push(bio);
    }
    parts.join(" ")
}

fn expert_text(expert: &ExpertProfile) -> String {
    let mut parts: Vec<&str> = expert
        .expertise_areas
        .iter()
        .chain(expert.skills.interests.iter())
        .chain(expert.skills.strengths.iter())
        .map(String::as_str)
        .collect();
    parts.push(&expert.field_of_study);
    parts.push(&expert.job_title);
    parts.join(" ")
}
