// ============================================
// Text Classifiers (文本分类)
// ============================================
//
// Shared pipeline: tokenizer -> TF-IDF (unigrams + bigrams) -> multinomial
// naive Bayes. Topic and feedback classifiers wrap trained pipelines in
// `ModelHandle`s so retraining swaps the model without blocking predictions.

pub mod corpus;
pub mod feedback;
pub mod naive_bayes;
pub mod tfidf;
pub mod topic;

pub use corpus::{FeedbackCorpus, LabeledCorpus, LabeledSample, TopicCorpus};
pub use feedback::{FeedbackAnalysis, FeedbackClassifier, FeedbackTrends, TextStatistics};
pub use topic::{TopicClassifier, TopicPrediction};

use crate::error::Result;
use crate::models::DegradedReason;
use chrono::{DateTime, Utc};
use naive_bayes::MultinomialNb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tfidf::TfidfVectorizer;

/// Label with its posterior; `degraded` is set when the default label was
/// returned without consulting a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    pub distribution: BTreeMap<String, f64>,
    pub degraded: Option<DegradedReason>,
}

impl Prediction {
    pub fn fallback(default_label: &str, reason: DegradedReason) -> Self {
        Self {
            label: default_label.to_string(),
            confidence: 0.0,
            distribution: BTreeMap::new(),
            degraded: Some(reason),
        }
    }
}

/// Every fifth sample of each class is held out for evaluation.
const HOLDOUT_EVERY: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingReport {
    pub samples: usize,
    pub classes: Vec<String>,
    pub vocabulary_size: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Accuracy on the held-out split of a model fitted on the rest; `None`
    /// when no class has enough samples to hold one out
    pub held_out_accuracy: Option<f64>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TextPipeline {
    vectorizer: TfidfVectorizer,
    model: MultinomialNb,
    /// Labels that had samples, in declaration order
    classes: Vec<String>,
    default_label: String,
    report: TrainingReport,
}

impl TextPipeline {
    /// Fit on `corpus`, with `preprocess` applied to every sample text.
    pub fn train(
        corpus: &LabeledCorpus,
        max_features: usize,
        alpha: f64,
        preprocess: fn(&str) -> String,
    ) -> Result<Self> {
        corpus.validate()?;

        let classes: Vec<String> = corpus
            .labels
            .iter()
            .filter(|label| corpus.samples.iter().any(|s| &s.label == *label))
            .cloned()
            .collect();

        let texts: Vec<String> = corpus.samples.iter().map(|s| preprocess(&s.text)).collect();
        let targets: Vec<usize> = corpus
            .samples
            .iter()
            .filter_map(|s| classes.iter().position(|c| c == &s.label))
            .collect();

        // Stratified split in corpus order, then a final fit on everything.
        let mut seen_per_class = vec![0usize; classes.len()];
        let (mut train_idx, mut test_idx) = (Vec::new(), Vec::new());
        for (i, &target) in targets.iter().enumerate() {
            seen_per_class[target] += 1;
            if seen_per_class[target] % HOLDOUT_EVERY == 0 {
                test_idx.push(i);
            } else {
                train_idx.push(i);
            }
        }

        let held_out_accuracy = if test_idx.is_empty() {
            None
        } else {
            let pick = |idx: &[usize]| -> (Vec<String>, Vec<usize>) {
                idx.iter().map(|&i| (texts[i].clone(), targets[i])).unzip()
            };
            let (train_texts, train_targets) = pick(&train_idx);
            let (test_texts, test_targets) = pick(&test_idx);
            let (vectorizer, model) = fit(&train_texts, &train_targets, classes.len(), max_features, alpha)?;
            Some(accuracy(&vectorizer, &model, &test_texts, &test_targets))
        };

        let (vectorizer, model) = fit(&texts, &targets, classes.len(), max_features, alpha)?;

        let report = TrainingReport {
            samples: texts.len(),
            classes: classes.clone(),
            vocabulary_size: vectorizer.vocabulary_size(),
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            held_out_accuracy,
            trained_at: Utc::now(),
        };

        Ok(Self {
            vectorizer,
            model,
            classes,
            default_label: corpus.default_label.clone(),
            report,
        })
    }

    /// `text` must already be preprocessed.
    pub fn predict(&self, text: &str) -> Prediction {
        if text.trim().is_empty() {
            return Prediction::fallback(&self.default_label, DegradedReason::EmptyText);
        }

        let row = self.vectorizer.transform(text);
        if row.is_empty() {
            return Prediction::fallback(&self.default_label, DegradedReason::NoKnownTerms);
        }

        let proba = self.model.predict_proba(&row);
        let best = argmax(&proba).unwrap_or(0);

        Prediction {
            label: self.classes[best].clone(),
            confidence: proba[best],
            distribution: self.classes.iter().cloned().zip(proba).collect(),
            degraded: None,
        }
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}

fn fit(
    texts: &[String],
    targets: &[usize],
    n_classes: usize,
    max_features: usize,
    alpha: f64,
) -> Result<(TfidfVectorizer, MultinomialNb)> {
    let vectorizer = TfidfVectorizer::fit(texts, max_features)?;
    let rows: Vec<_> = texts.iter().map(|t| vectorizer.transform(t)).collect();
    let model = MultinomialNb::fit(&rows, targets, n_classes, vectorizer.vocabulary_size(), alpha)?;
    Ok((vectorizer, model))
}

fn accuracy(vectorizer: &TfidfVectorizer, model: &MultinomialNb, texts: &[String], targets: &[usize]) -> f64 {
    let correct = texts
        .iter()
        .zip(targets)
        .filter(|(text, &target)| argmax(&model.predict_proba(&vectorizer.transform(text))) == Some(target))
        .count();
    correct as f64 / texts.len() as f64
}

/// First index of the maximum; ties go to the earlier class.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, value) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= *value => {}
            _ => best = Some(idx),
        }
    }
    best
}
