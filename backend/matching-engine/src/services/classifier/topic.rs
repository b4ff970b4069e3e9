//! Topic classification over the bundled academic-topic corpus.

use super::corpus::TopicCorpus;
use super::{Prediction, TextPipeline, TrainingReport};
use crate::error::Result;
use crate::models::DegradedReason;
use crate::services::model_handle::ModelHandle;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub type TopicPrediction = Prediction;

const TOPIC_ALPHA: f64 = 1.0;

struct TrainedTopics {
    pipeline: TextPipeline,
    categories: Vec<String>,
    related: BTreeMap<String, Vec<String>>,
}

pub struct TopicClassifier {
    model: ModelHandle<TrainedTopics>,
    default_label: String,
    max_features: usize,
}

fn preprocess(text: &str) -> String {
    text.to_lowercase()
}

impl TopicClassifier {
    /// Untrained classifier; every prediction degrades to `default_label`.
    pub fn new(default_label: impl Into<String>, max_features: usize) -> Self {
        Self {
            model: ModelHandle::empty(),
            default_label: default_label.into(),
            max_features,
        }
    }

    /// Train from the corpus compiled into the crate.
    pub fn bundled(max_features: usize) -> Result<Self> {
        let corpus = TopicCorpus::bundled()?;
        let classifier = Self::new(corpus.default_label.clone(), max_features);
        classifier.train(&corpus)?;
        Ok(classifier)
    }

    /// Fit a new model and swap it in. On error the previous model stays.
    pub fn train(&self, corpus: &TopicCorpus) -> Result<TrainingReport> {
        let labeled = corpus.to_labeled();
        let pipeline = TextPipeline::train(&labeled, self.max_features, TOPIC_ALPHA, preprocess)?;
        let report = pipeline.report().clone();

        self.model.store(TrainedTopics {
            pipeline,
            categories: corpus.phrases.keys().cloned().collect(),
            related: corpus.related.clone(),
        });

        info!(
            samples = report.samples,
            classes = report.classes.len(),
            vocabulary_size = report.vocabulary_size,
            test_samples = report.test_samples,
            held_out_accuracy = ?report.held_out_accuracy,
            "Topic classifier trained"
        );
        Ok(report)
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn report(&self) -> Option<TrainingReport> {
        self.model.load().map(|m| m.pipeline.report().clone())
    }

    pub fn predict(&self, text: &str) -> TopicPrediction {
        match self.model.load() {
            Some(model) => model.pipeline.predict(&preprocess(text)),
            None => {
                warn!(reason = DegradedReason::ModelUnavailable.as_str(), "Topic classifier untrained");
                Prediction::fallback(&self.default_label, DegradedReason::ModelUnavailable)
            }
        }
    }

    pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<TopicPrediction> {
        texts.iter().map(|t| self.predict(t.as_ref())).collect()
    }

    /// Top TF-IDF terms of `text` with positive weight. Empty when untrained.
    pub fn extract_keywords(&self, text: &str, n: usize) -> Vec<(String, f64)> {
        self.model
            .load()
            .map(|m| m.pipeline.vectorizer().top_terms(&preprocess(text), n))
            .unwrap_or_default()
    }

    /// Related categories for `topic`, padded with the other known categories.
    pub fn suggest_related(&self, topic: &str, n: usize) -> Vec<String> {
        let Some(model) = self.model.load() else {
            return Vec::new();
        };

        let mut suggestions: Vec<String> = model.related.get(topic).cloned().unwrap_or_default();
        for category in &model.categories {
            if suggestions.len() >= n {
                break;
            }
            if category != topic && !suggestions.contains(category) {
                suggestions.push(category.clone());
            }
        }
        suggestions.truncate(n);
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_classifier_predicts_categories() {
        let classifier = TopicClassifier::bundled(5000).unwrap();
        assert!(classifier.is_trained());

        let prediction = classifier.predict("I need help with calculus derivatives");
        assert_eq!(prediction.label, "Mathematics");
        assert!(prediction.confidence > 0.0);
        assert!((prediction.distribution.values().sum::<f64>() - 1.0).abs() < 1e-9);

        assert_eq!(classifier.predict("").label, "Other");
        assert_eq!(classifier.predict("").degraded, Some(DegradedReason::EmptyText));
        assert_eq!(
            classifier.predict("zzzz qqqq").degraded,
            Some(DegradedReason::NoKnownTerms)
        );
    }

    #[test]
    fn test_untrained_classifier_degrades() {
        let classifier = TopicClassifier::new("Other", 100);
        let prediction = classifier.predict("calculus");
        assert_eq!(prediction.label, "Other");
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.degraded, Some(DegradedReason::ModelUnavailable));
        assert!(classifier.extract_keywords("calculus", 5).is_empty());
        assert!(classifier.report().is_none());
    }

    #[test]
    fn test_report_carries_held_out_accuracy() {
        let classifier = TopicClassifier::bundled(5000).unwrap();
        let report = classifier.report().unwrap();
        assert!(report.test_samples > 0);
        assert_eq!(report.train_samples + report.test_samples, report.samples);
        let accuracy = report.held_out_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_predict_batch() {
        let classifier = TopicClassifier::bundled(5000).unwrap();
        let predictions = classifier.predict_batch(&["organic chemistry", ""]);
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].label, "Other");
    }

    #[test]
    fn test_extract_keywords() {
        let classifier = TopicClassifier::bundled(5000).unwrap();
        let keywords = classifier.extract_keywords("studying calculus derivatives", 3);
        assert!(!keywords.is_empty() && keywords.len() <= 3);
        assert!(keywords.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(keywords.iter().all(|(_, w)| *w > 0.0));
    }

    #[test]
    fn test_suggest_related() {
        let classifier = TopicClassifier::bundled(5000).unwrap();

        let related = classifier.suggest_related("Physics", 5);
        assert_eq!(&related[..3], &["Mathematics", "Chemistry", "Engineering"]);
        assert_eq!(related.len(), 5);
        assert!(!related.contains(&"Physics".to_string()));

        assert_eq!(classifier.suggest_related("Physics", 2), vec!["Mathematics", "Chemistry"]);
    }
}
