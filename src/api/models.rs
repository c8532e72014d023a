use crate::analysis::{AnalysisError, ReviewAnalysis, ReviewAnalyzer, Sentiment};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::error;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ReviewAnalyzer>,
}

/// Request to analyse a review
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub review: String,
}

/// Any non-string value reads as empty text
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        _ => String::new(),
    })
}

/// Sentiment and keyphrases for one review
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub sentiment: Sentiment,
    pub score: f64,
    pub keywords: Vec<String>,
}

impl From<ReviewAnalysis> for AnalyzeResponse {
    fn from(analysis: ReviewAnalysis) -> Self {
        Self {
            sentiment: analysis.sentiment,
            score: analysis.score,
            keywords: analysis.keywords,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// The request body could not be read
    Body(StatusCode, String),
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Body(rejection.status(), rejection.body_text())
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Body(status, msg) => (status, msg),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse {
            error: status.to_string(),
            message,
        }))
        .into_response()
    }
}
