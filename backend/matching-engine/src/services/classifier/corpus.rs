//! Training corpora bundled into the crate.

use crate::error::{MatchingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOPIC_CORPUS_JSON: &str = include_str!("../../../corpus/topics.json");
const FEEDBACK_CORPUS_JSON: &str = include_str!("../../../corpus/feedback.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub text: String,
    pub label: String,
}

/// Labels in declaration order plus samples. Every sample label must be declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledCorpus {
    pub labels: Vec<String>,
    pub default_label: String,
    pub samples: Vec<LabeledSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCorpus {
    pub default_label: String,
    pub labels: Vec<String>,
    /// Templates with a single `{}` placeholder for the phrase
    pub variations: Vec<String>,
    pub phrases: BTreeMap<String, Vec<String>>,
    pub related: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCorpus {
    pub sentiment: LabeledCorpus,
    pub quality: LabeledCorpus,
}

impl LabeledCorpus {
    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(MatchingError::Corpus("corpus has no samples".to_string()));
        }
        if !self.labels.contains(&self.default_label) {
            return Err(MatchingError::Corpus(format!(
                "default label '{}' is not declared",
                self.default_label
            )));
        }
        if let Some(sample) = self.samples.iter().find(|s| !self.labels.contains(&s.label)) {
            return Err(MatchingError::Corpus(format!(
                "sample label '{}' is not declared",
                sample.label
            )));
        }
        Ok(())
    }
}

impl TopicCorpus {
    pub fn bundled() -> Result<Self> {
        let corpus: TopicCorpus = serde_json::from_str(TOPIC_CORPUS_JSON)
            .map_err(|e| MatchingError::Corpus(format!("topics.json: {e}")))?;
        corpus.to_labeled().validate()?;
        Ok(corpus)
    }

    /// Each phrase plus every variation of it, labeled with its category.
    pub fn to_labeled(&self) -> LabeledCorpus {
        let mut samples = Vec::new();
        for (label, phrases) in &self.phrases {
            for phrase in phrases {
                samples.push(LabeledSample {
                    text: phrase.clone(),
                    label: label.clone(),
                });
                for template in &self.variations {
                    samples.push(LabeledSample {
                        text: template.replacen("{}", phrase, 1),
                        label: label.clone(),
                    });
                }
            }
        }

        LabeledCorpus {
            labels: self.labels.clone(),
            default_label: self.default_label.clone(),
            samples,
        }
    }
}

impl FeedbackCorpus {
    pub fn bundled() -> Result<Self> {
        let corpus: FeedbackCorpus = serde_json::from_str(FEEDBACK_CORPUS_JSON)
            .map_err(|e| MatchingError::Corpus(format!("feedback.json: {e}")))?;
        corpus.sentiment.validate()?;
        corpus.quality.validate()?;
        Ok(corpus)
    }
}
