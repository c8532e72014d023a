pub mod keywords;
pub mod sentiment;
pub mod stopwords;

pub use keywords::{Embedder, EmbeddingKeyphraseExtractor, KeyphraseExtractor};
pub use sentiment::{Sentiment, SentimentScorer, VaderScorer};

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("sentiment scorer failed: {0}")]
    Scorer(String),
    #[error("sentiment scorer returned a non-finite score ({0})")]
    NonFiniteScore(f64),
    #[error("analysis worker failed: {0}")]
    Worker(String),
}

/// Releases memory an accelerator device keeps cached between model calls
pub trait AcceleratorCache: Send + Sync {
    fn clear(&self);
}

/// Outcome of analysing one review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewAnalysis {
    pub sentiment: Sentiment,
    pub score: f64,
    pub keywords: Vec<String>,
}

/// Immutable model handles, built once at startup and shared by every request
pub struct ReviewAnalyzer {
    scorer: Arc<dyn SentimentScorer>,
    extractor: Arc<dyn KeyphraseExtractor>,
    accelerator: Option<Arc<dyn AcceleratorCache>>,
}

impl ReviewAnalyzer {
    pub fn new(scorer: Arc<dyn SentimentScorer>, extractor: Arc<dyn KeyphraseExtractor>) -> Self {
        Self {
            scorer,
            extractor,
            accelerator: None,
        }
    }

    /// Clear `accelerator` before every analysis. The CPU execution provider used by
    /// `main` keeps no device cache, so only accelerator-backed builds install one.
    #[allow(dead_code)]
    pub fn with_accelerator(mut self, accelerator: Arc<dyn AcceleratorCache>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    pub async fn analyze(&self, review: &str) -> Result<ReviewAnalysis, AnalysisError> {
        if let Some(accelerator) = &self.accelerator {
            debug!("Clearing accelerator cache");
            accelerator.clear();
        }

        let scorer = Arc::clone(&self.scorer);
        let text = review.to_string();
        let score_task = tokio::task::spawn_blocking(move || scorer.score(&text));

        let extractor = Arc::clone(&self.extractor);
        let text = review.to_string();
        let keyword_task = tokio::task::spawn_blocking(move || extractor.extract(&text));

        let (score, keywords) = tokio::try_join!(score_task, keyword_task)
            .map_err(|e| AnalysisError::Worker(e.to_string()))?;
        let score = score?;
        let keywords = keywords?;

        if !score.is_finite() {
            return Err(AnalysisError::NonFiniteScore(score));
        }

        Ok(ReviewAnalysis {
            sentiment: Sentiment::from_compound(score),
            score,
            keywords,
        })
    }
}
