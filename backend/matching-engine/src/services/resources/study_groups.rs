use crate::models::{StudyGroup, UserProfile};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedStudyGroup {
    pub group_id: String,
    pub score: f64,
}

/// Ranks open study groups by topic fit and group size.
#[derive(Debug, Clone, Default)]
pub struct StudyGroupRanker;

impl StudyGroupRanker {
    pub fn new() -> Self {
        Self
    }

    pub fn rank(&self, user: &UserProfile, groups: &[StudyGroup], k: usize) -> Vec<RankedStudyGroup> {
        let mut ranked: Vec<RankedStudyGroup> = groups
            .iter()
            .map(|g| RankedStudyGroup {
                group_id: g.id.clone(),
                score: self.score(user, g),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.group_id.cmp(&b.group_id))
        });
        ranked.truncate(k);

        info!(
            user_id = %user.id,
            input_count = groups.len(),
            output_count = ranked.len(),
            "Study group ranking completed"
        );

        ranked
    }

    pub fn score(&self, user: &UserProfile, group: &StudyGroup) -> f64 {
        let topic = group.topic.to_lowercase();
        let mut score = 0.0;

        if user
            .skills
            .interests
            .iter()
            .any(|i| !i.is_empty() && topic.contains(&i.to_lowercase()))
        {
            score += 0.4;
        }

        let field = user.field_of_study.to_lowercase();
        if !field.is_empty() && topic.contains(&field) {
            score += 0.3;
        }

        let members = group.member_ids.len() as f64;
        if members >= 2.0 && members <= group.max_members as f64 * 0.8 {
            score += 0.2;
        } else if members < 2.0 {
            score += 0.1;
        }

        // base activity credit
        score + 0.1
    }
}
