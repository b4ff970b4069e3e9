// ============================================
// Feedback Analysis (反馈分析)
// ============================================
//
// Sentiment (negative/neutral/positive) and session quality
// (poor/average/good/excellent) models, plus text statistics, key phrases,
// an overall 0-5 score, insights and cross-feedback trends.

use super::corpus::FeedbackCorpus;
use super::{Prediction, TextPipeline, TrainingReport};
use crate::error::Result;
use crate::models::DegradedReason;
use crate::services::model_handle::ModelHandle;
use crate::utils::round_to;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

const SENTIMENT_ALPHA: f64 = 1.0;
const QUALITY_ALPHA: f64 = 0.1;
const NEUTRAL_SCORE: f64 = 3.0;

const SENTIMENT_LABELS: [&str; 3] = ["negative", "neutral", "positive"];
const QUALITY_LABELS: [&str; 4] = ["poor", "average", "good", "excellent"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStatistics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_word_length: f64,
    /// Length in characters
    pub text_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackAnalysis {
    pub sentiment: Prediction,
    pub quality: Prediction,
    pub text_stats: TextStatistics,
    pub key_phrases: Vec<String>,
    /// 0-5, two decimals
    pub overall_score: f64,
    /// Rating that was blended into the score, if any
    pub rating: Option<f64>,
    pub insights: Vec<String>,
    pub degraded: Vec<DegradedReason>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackTrends {
    pub total_feedback: usize,
    pub average_score: f64,
    pub score_std: f64,
    pub sentiment_distribution: BTreeMap<String, usize>,
    pub quality_distribution: BTreeMap<String, usize>,
    pub positive_ratio: f64,
    pub high_quality_ratio: f64,
    pub improvement_areas: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackTrainingReport {
    pub sentiment: TrainingReport,
    pub quality: TrainingReport,
}

struct FeedbackModels {
    sentiment: TextPipeline,
    quality: TextPipeline,
}

pub struct FeedbackClassifier {
    models: ModelHandle<FeedbackModels>,
    max_features: usize,
    key_phrase_count: usize,
}

/// Lowercase, keep ASCII letters and whitespace, collapse whitespace.
pub fn preprocess(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn text_statistics(text: &str) -> TextStatistics {
    let words: Vec<&str> = text.split_whitespace().collect();
    let sentence_count = text.split('.').filter(|s| !s.trim().is_empty()).count();
    let avg_word_length = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    TextStatistics {
        word_count: words.len(),
        sentence_count,
        avg_word_length,
        text_length: text.chars().count(),
    }
}

/// Most frequent preprocessed words longer than three characters; ties keep
/// first-appearance order.
pub fn key_phrases(text: &str, n: usize) -> Vec<String> {
    let processed = preprocess(text);
    let mut order: Vec<&str> = Vec::new();
    let mut freq: HashMap<&str, usize> = HashMap::new();

    for word in processed.split_whitespace().filter(|w| w.chars().count() > 3) {
        let count = freq.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // stable sort keeps first appearance among equal counts
    order.sort_by(|a, b| freq[b].cmp(&freq[a]));
    order.into_iter().take(n).map(str::to_string).collect()
}

fn sentiment_value(label: &str) -> f64 {
    match label {
        "negative" => 1.0,
        "positive" => 5.0,
        _ => NEUTRAL_SCORE,
    }
}

fn quality_value(label: &str) -> f64 {
    match label {
        "poor" => 1.0,
        "average" => 2.5,
        "good" => 4.0,
        "excellent" => 5.0,
        _ => NEUTRAL_SCORE,
    }
}

/// Mean of the confidence-weighted label values, averaged with the rating
/// when one is given. A degraded prediction contributes 3.0 in place of its
/// weighted value.
pub fn overall_score(sentiment: &Prediction, quality: &Prediction, rating: Option<f64>) -> f64 {
    let weighted = |prediction: &Prediction, value: f64| match prediction.degraded {
        Some(_) => NEUTRAL_SCORE,
        None => value * prediction.confidence.clamp(0.0, 1.0),
    };
    let s = weighted(sentiment, sentiment_value(&sentiment.label));
    let q = weighted(quality, quality_value(&quality.label));
    let ml = (s + q) / 2.0;

    let overall = match rating {
        Some(r) => (ml + r) / 2.0,
        None => ml,
    };
    round_to(overall, 2)
}

fn insights(sentiment: &str, quality: &str, overall: f64, word_count: usize) -> Vec<String> {
    let mut insights = Vec::new();

    match sentiment {
        "positive" => insights.push("Positive feedback indicates successful learning experience"),
        "negative" => insights.push("Negative sentiment suggests areas for improvement needed"),
        _ => {}
    }
    match quality {
        "excellent" => insights.push("High-quality session with exceptional delivery"),
        "poor" => insights.push("Session quality needs significant improvement"),
        _ => {}
    }
    if overall >= 4.0 {
        insights.push("Strong overall performance with high satisfaction");
    } else if overall <= 2.0 {
        insights.push("Low satisfaction score requires immediate attention");
    }
    if word_count > 50 {
        insights.push("Detailed feedback provides rich information for improvement");
    } else if word_count < 10 {
        insights.push("Brief feedback may lack sufficient detail for analysis");
    }

    insights.into_iter().map(str::to_string).collect()
}

impl FeedbackClassifier {
    pub fn new(max_features: usize, key_phrase_count: usize) -> Self {
        Self {
            models: ModelHandle::empty(),
            max_features,
            key_phrase_count,
        }
    }

    pub fn bundled(max_features: usize, key_phrase_count: usize) -> Result<Self> {
        let corpus = FeedbackCorpus::bundled()?;
        let classifier = Self::new(max_features, key_phrase_count);
        classifier.train(&corpus)?;
        Ok(classifier)
    }

    /// Fit both models, then swap them in together.
    pub fn train(&self, corpus: &FeedbackCorpus) -> Result<FeedbackTrainingReport> {
        let sentiment = TextPipeline::train(&corpus.sentiment, self.max_features, SENTIMENT_ALPHA, preprocess)?;
        let quality = TextPipeline::train(&corpus.quality, self.max_features, QUALITY_ALPHA, preprocess)?;

        let report = FeedbackTrainingReport {
            sentiment: sentiment.report().clone(),
            quality: quality.report().clone(),
        };
        self.models.store(FeedbackModels { sentiment, quality });

        info!(
            sentiment_samples = report.sentiment.samples,
            quality_samples = report.quality.samples,
            sentiment_accuracy = ?report.sentiment.held_out_accuracy,
            quality_accuracy = ?report.quality.held_out_accuracy,
            "Feedback classifier trained"
        );
        Ok(report)
    }

    pub fn is_trained(&self) -> bool {
        self.models.is_loaded()
    }

    pub fn report(&self) -> Option<FeedbackTrainingReport> {
        self.models.load().map(|m| FeedbackTrainingReport {
            sentiment: m.sentiment.report().clone(),
            quality: m.quality.report().clone(),
        })
    }

    /// Never fails; degraded paths are listed in `degraded`.
    pub fn analyze(&self, text: &str, rating: Option<f64>) -> FeedbackAnalysis {
        let mut degraded = Vec::new();

        let rating = match rating {
            Some(r) if r.is_finite() && (1.0..=5.0).contains(&r) => Some(r),
            Some(r) => {
                warn!(rating = r, reason = DegradedReason::InvalidRatingIgnored.as_str(), "Ignoring rating");
                degraded.push(DegradedReason::InvalidRatingIgnored);
                None
            }
            None => None,
        };

        let processed = preprocess(text);
        let (sentiment, quality) = match self.models.load() {
            Some(models) => (
                models.sentiment.predict(&processed),
                models.quality.predict(&processed),
            ),
            None => {
                warn!(reason = DegradedReason::ModelUnavailable.as_str(), "Feedback classifier untrained");
                (
                    Prediction::fallback(SENTIMENT_LABELS[1], DegradedReason::ModelUnavailable),
                    Prediction::fallback(QUALITY_LABELS[1], DegradedReason::ModelUnavailable),
                )
            }
        };

        for reason in [sentiment.degraded, quality.degraded].into_iter().flatten() {
            if !degraded.contains(&reason) {
                degraded.push(reason);
            }
        }

        let text_stats = text_statistics(text);
        let overall_score = overall_score(&sentiment, &quality, rating);
        let insights = insights(&sentiment.label, &quality.label, overall_score, text_stats.word_count);

        debug!(
            sentiment = %sentiment.label,
            quality = %quality.label,
            overall_score = overall_score,
            "Feedback analyzed"
        );

        FeedbackAnalysis {
            key_phrases: key_phrases(text, self.key_phrase_count),
            sentiment,
            quality,
            text_stats,
            overall_score,
            rating,
            insights,
            degraded,
            analyzed_at: Utc::now(),
        }
    }

    pub fn analyze_batch(&self, items: &[(String, Option<f64>)]) -> Vec<FeedbackAnalysis> {
        items.iter().map(|(text, rating)| self.analyze(text, *rating)).collect()
    }

    /// Aggregate view over many analyses. Empty input yields zeroed trends.
    pub fn trends(&self, analyses: &[FeedbackAnalysis]) -> FeedbackTrends {
        trends(analyses)
    }
}

pub fn trends(analyses: &[FeedbackAnalysis]) -> FeedbackTrends {
    if analyses.is_empty() {
        return FeedbackTrends::default();
    }

    let n = analyses.len() as f64;
    let scores: Vec<f64> = analyses.iter().map(|a| a.overall_score).collect();
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    let count = |pred: fn(&FeedbackAnalysis) -> bool| analyses.iter().filter(|a| pred(a)).count();

    let sentiment_distribution: BTreeMap<String, usize> = SENTIMENT_LABELS
        .iter()
        .map(|label| {
            let c = analyses.iter().filter(|a| a.sentiment.label == *label).count();
            (label.to_string(), c)
        })
        .collect();
    let quality_distribution: BTreeMap<String, usize> = QUALITY_LABELS
        .iter()
        .map(|label| {
            let c = analyses.iter().filter(|a| a.quality.label == *label).count();
            (label.to_string(), c)
        })
        .collect();

    let negative = count(|a| a.sentiment.label == "negative") as f64;
    let low_quality = count(|a| matches!(a.quality.label.as_str(), "poor" | "average")) as f64;
    let low_scores = count(|a| a.overall_score < 2.5) as f64;
    let positive_ratio = count(|a| a.sentiment.label == "positive") as f64 / n;
    let high_quality_ratio = count(|a| matches!(a.quality.label.as_str(), "good" | "excellent")) as f64 / n;

    let mut improvement_areas = Vec::new();
    if negative > n * 0.3 {
        improvement_areas.push("High negative feedback rate requires attention".to_string());
    }
    if low_quality > n * 0.4 {
        improvement_areas.push("Session quality needs improvement".to_string());
    }
    if low_scores > n * 0.25 {
        improvement_areas.push("Overall satisfaction scores are concerning".to_string());
    }

    let average_score = round_to(mean, 2);
    let negative_feedback: Vec<&FeedbackAnalysis> =
        analyses.iter().filter(|a| a.sentiment.label == "negative").collect();
    let common_issues = if negative_feedback.len() > 2 {
        common_issues(&negative_feedback)
    } else {
        Vec::new()
    };
    let recommendations = recommendations(
        average_score,
        positive_ratio,
        high_quality_ratio,
        &improvement_areas,
        &common_issues,
    );

    FeedbackTrends {
        total_feedback: analyses.len(),
        average_score,
        score_std: round_to(variance.sqrt(), 2),
        sentiment_distribution,
        quality_distribution,
        positive_ratio,
        high_quality_ratio,
        improvement_areas,
        recommendations,
    }
}

/// Key phrases repeated across negative feedback, mapped to issue categories.
/// At most three phrases are considered, in first-appearance order.
fn common_issues(negative: &[&FeedbackAnalysis]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for phrase in negative.iter().flat_map(|a| a.key_phrases.iter()) {
        let count = freq.entry(phrase.as_str()).or_insert(0);
        if *count == 0 {
            order.push(phrase.as_str());
        }
        *count += 1;
    }

    let mut issues: Vec<String> = Vec::new();
    for phrase in order
        .into_iter()
        .filter(|p| freq[p] >= 2 && p.chars().count() > 3)
        .take(3)
    {
        let issue = match phrase {
            "unprepared" | "preparation" | "organized" => "Poor session preparation".to_string(),
            "explanation" | "unclear" | "confusing" => "Unclear explanations and communication".to_string(),
            "time" | "management" | "wasted" => "Poor time management".to_string(),
            "knowledge" | "understanding" | "lacks" => "Insufficient subject knowledge".to_string(),
            other => format!("Recurring concern: {other}"),
        };
        if !issues.contains(&issue) {
            issues.push(issue);
        }
    }
    issues
}

fn recommendations(
    average_score: f64,
    positive_ratio: f64,
    high_quality_ratio: f64,
    improvement_areas: &[String],
    common_issues: &[String],
) -> Vec<String> {
    let mut recs = Vec::new();

    if average_score < 2.5 {
        recs.push("Overall satisfaction is low - consider reviewing session quality and teaching methods".to_string());
    } else if average_score > 4.0 {
        recs.push("Excellent performance - continue current practices and share successful strategies".to_string());
    }

    if positive_ratio < 0.4 {
        recs.push("High negative sentiment detected - focus on improving user experience and engagement".to_string());
    } else if positive_ratio > 0.7 {
        recs.push("Strong positive sentiment - consider expanding successful approaches".to_string());
    }

    if high_quality_ratio < 0.5 {
        recs.push("Session quality needs improvement - provide additional training and resources".to_string());
    }

    recs.extend(improvement_areas.iter().map(|area| format!("Action needed: {area}")));
    recs.extend(common_issues.iter().map(|issue| format!("Address recurring issue: {issue}")));

    if recs.is_empty() {
        recs.push("Overall feedback is positive - maintain current quality standards".to_string());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, confidence: f64) -> Prediction {
        Prediction {
            label: label.to_string(),
            confidence,
            distribution: BTreeMap::new(),
            degraded: None,
        }
    }

    fn analysis(sentiment: &str, quality: &str, score: f64) -> FeedbackAnalysis {
        FeedbackAnalysis {
            sentiment: prediction(sentiment, 0.9),
            quality: prediction(quality, 0.9),
            text_stats: text_statistics("ok"),
            key_phrases: Vec::new(),
            overall_score: score,
            rating: None,
            insights: Vec::new(),
            degraded: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess("  Great!! Session, 10/10  "), "great session");
        assert_eq!(preprocess("Don't stop"), "dont stop");
    }

    #[test]
    fn test_text_statistics() {
        let stats = text_statistics("Very good. Learned a lot.");
        assert_eq!(stats.word_count, 5);
        assert_eq!(stats.sentence_count, 2);
        assert_eq!(stats.text_length, 25);
        assert!((stats.avg_word_length - 21.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_key_phrases_frequency_then_first_seen() {
        let phrases = key_phrases("Clear examples, clear pacing, good examples and patient tutor", 3);
        assert_eq!(phrases, vec!["clear", "examples", "pacing"]);
    }

    #[test]
    fn test_overall_score() {
        let s = prediction("positive", 1.0);
        let q = prediction("good", 1.0);
        assert_eq!(overall_score(&s, &q, None), 4.5);
        assert_eq!(overall_score(&s, &q, Some(5.0)), 4.75);

        // (5.0 * 0.8 + 4.0 * 0.7) / 2
        let s = prediction("positive", 0.8);
        let q = prediction("good", 0.7);
        assert_eq!(overall_score(&s, &q, None), 3.4);

        let low = prediction("negative", 0.5);
        let poor = prediction("poor", 0.5);
        assert_eq!(overall_score(&low, &poor, None), 0.5);

        // fallback predictions count as neutral
        let s0 = Prediction::fallback("neutral", DegradedReason::EmptyText);
        let q0 = Prediction::fallback("average", DegradedReason::EmptyText);
        assert_eq!(overall_score(&s0, &q0, None), 3.0);
        assert_eq!(overall_score(&s0, &q, None), 2.9);
    }

    #[test]
    fn test_empty_feedback_is_neutral() {
        let classifier = FeedbackClassifier::bundled(1000, 5).unwrap();
        let analysis = classifier.analyze("", None);
        assert_eq!(analysis.sentiment.label, "neutral");
        assert_eq!(analysis.quality.label, "average");
        assert_eq!(analysis.overall_score, 3.0);
        assert_eq!(analysis.degraded, vec![DegradedReason::EmptyText]);
    }

    #[test]
    fn test_invalid_rating_ignored() {
        let classifier = FeedbackClassifier::bundled(1000, 5).unwrap();
        let analysis = classifier.analyze("", Some(f64::NAN));
        assert_eq!(analysis.rating, None);
        assert_eq!(analysis.overall_score, 3.0);
        assert!(analysis.degraded.contains(&DegradedReason::InvalidRatingIgnored));

        let rated = classifier.analyze("", Some(5.0));
        assert_eq!(rated.overall_score, 4.0);
    }

    #[test]
    fn test_analyze_sentiment_direction() {
        let classifier = FeedbackClassifier::bundled(1000, 5).unwrap();
        let positive = classifier.analyze("The study session was incredibly helpful and engaging", None);
        assert_eq!(positive.sentiment.label, "positive");
        assert!(positive
            .insights
            .contains(&"Positive feedback indicates successful learning experience".to_string()));
    }

    #[test]
    fn test_untrained_classifier_degrades() {
        let classifier = FeedbackClassifier::new(1000, 5);
        let analysis = classifier.analyze("great session", None);
        assert_eq!(analysis.sentiment.label, "neutral");
        assert_eq!(analysis.degraded, vec![DegradedReason::ModelUnavailable]);
    }

    #[test]
    fn test_trends() {
        let analyses = vec![
            analysis("negative", "poor", 1.5),
            analysis("negative", "average", 2.0),
            analysis("positive", "good", 4.5),
            analysis("neutral", "average", 3.0),
        ];
        let trends = trends(&analyses);

        assert_eq!(trends.total_feedback, 4);
        assert_eq!(trends.average_score, 2.75);
        assert_eq!(trends.sentiment_distribution["negative"], 2);
        assert_eq!(trends.quality_distribution["excellent"], 0);
        assert_eq!(trends.positive_ratio, 0.25);
        assert_eq!(trends.high_quality_ratio, 0.25);
        assert_eq!(
            trends.improvement_areas,
            vec![
                "High negative feedback rate requires attention",
                "Session quality needs improvement",
                "Overall satisfaction scores are concerning",
            ]
        );
        assert!(trends
            .recommendations
            .contains(&"Action needed: Session quality needs improvement".to_string()));
    }

    #[test]
    fn test_trends_recurring_issues() {
        let mut analyses: Vec<FeedbackAnalysis> = [
            vec!["unprepared", "confusing", "tutor"],
            vec!["tutor", "unprepared", "late"],
            vec!["confusing", "slides"],
        ]
        .into_iter()
        .map(|phrases| {
            let mut a = analysis("negative", "poor", 1.5);
            a.key_phrases = phrases.into_iter().map(str::to_string).collect();
            a
        })
        .collect();

        let issues: Vec<String> = trends(&analyses)
            .recommendations
            .into_iter()
            .filter(|r| r.starts_with("Address recurring issue"))
            .collect();
        assert_eq!(
            issues,
            vec![
                "Address recurring issue: Poor session preparation",
                "Address recurring issue: Unclear explanations and communication",
                "Address recurring issue: Recurring concern: tutor",
            ]
        );

        // two negatives are not enough to call an issue recurring
        analyses.pop();
        assert!(trends(&analyses)
            .recommendations
            .iter()
            .all(|r| !r.starts_with("Address recurring issue")));
    }

    #[test]
    fn test_trends_default_recommendation() {
        let analyses = vec![
            analysis("positive", "good", 3.8),
            analysis("neutral", "good", 3.6),
        ];
        let trends = trends(&analyses);
        assert!(trends.improvement_areas.is_empty());
        assert_eq!(
            trends.recommendations,
            vec!["Overall feedback is positive - maintain current quality standards"]
        );
        assert_eq!(FeedbackClassifier::new(10, 5).trends(&[]), FeedbackTrends::default());
    }
}
