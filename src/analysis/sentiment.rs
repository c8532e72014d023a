use super::AnalysisError;
use serde::Serialize;
use std::collections::HashMap;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Compound scores at or above this value are positive
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound scores at or below this value are negative
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Map a compound score onto a label. Both thresholds are inclusive.
    pub fn from_compound(score: f64) -> Self {
        if score >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if score <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a compound polarity score in [-1.0, 1.0] for a piece of text
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<f64, AnalysisError>;
}

/// Lexicon and rule based scorer (VADER)
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> Result<f64, AnalysisError> {
        if text.trim().is_empty() {
            return Ok(0.0);
        }

        compound(&self.analyzer.polarity_scores(text))
    }
}

fn compound(scores: &HashMap<&str, f64>) -> Result<f64, AnalysisError> {
    scores
        .get("compound")
        .copied()
        .ok_or_else(|| AnalysisError::Scorer("polarity scores carry no compound value".to_string()))
}
