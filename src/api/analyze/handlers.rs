use crate::api::models::*;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::{debug, info};

pub async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    // Bodies that are not a JSON object are analysed as an empty review
    let request = match payload {
        Ok(Json(request)) => request,
        Err(
            rejection @ (JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_)),
        ) => {
            debug!(reason = %rejection, "Unusable request body, treating review as empty");
            AnalyzeRequest::default()
        }
        Err(rejection) => return Err(AppError::from(rejection)),
    };

    info!(review_len = request.review.len(), "Analyzing review");

    let analysis = state.analyzer.analyze(&request.review).await?;

    info!(
        sentiment = %analysis.sentiment,
        score = analysis.score,
        keywords = analysis.keywords.len(),
        "Review analyzed"
    );

    Ok(Json(analysis.into()))
}

#[cfg(test)]
mod tests {
    use crate::analysis::{
        AcceleratorCache, AnalysisError, KeyphraseExtractor, ReviewAnalyzer, SentimentScorer,
        VaderScorer,
    };
    use crate::api::{build_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Returns every non-empty word of the review, capped at five
    struct EchoWords;

    impl KeyphraseExtractor for EchoWords {
        fn extract(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
            Ok(text
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .filter(|w| !w.is_empty())
                .take(5)
                .collect())
        }
    }

    struct FailingExtractor;

    impl KeyphraseExtractor for FailingExtractor {
        fn extract(&self, _text: &str) -> Result<Vec<String>, AnalysisError> {
            Err(AnalysisError::Embedding("onnx session lost".to_string()))
        }
    }

    struct FixedScore(f64);

    impl SentimentScorer for FixedScore {
        fn score(&self, _text: &str) -> Result<f64, AnalysisError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct CountingCache(AtomicUsize);

    impl AcceleratorCache for CountingCache {
        fn clear(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app_with(analyzer: ReviewAnalyzer) -> Router {
        build_router(AppState {
            analyzer: Arc::new(analyzer),
        })
    }

    fn app() -> Router {
        app_with(ReviewAnalyzer::new(
            Arc::new(VaderScorer::new()),
            Arc::new(EchoWords),
        ))
    }

    fn json_post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn neutral_empty() -> Value {
        json!({"sentiment": "neutral", "score": 0.0, "keywords": []})
    }

    #[tokio::test]
    async fn empty_review_is_neutral() {
        let (status, body) = call(app(), json_post(r#"{"review": ""}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, neutral_empty());
    }

    #[tokio::test]
    async fn missing_review_matches_empty_review() {
        let (status, body) = call(app(), json_post("{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, neutral_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_treated_as_empty() {
        for raw in ["{not json", "", "[1, 2, 3]", "\"just a string\""] {
            let (status, body) = call(app(), json_post(raw)).await;
            assert_eq!(status, StatusCode::OK, "body: {raw}");
            assert_eq!(body, neutral_empty(), "body: {raw}");
        }
    }

    #[tokio::test]
    async fn missing_content_type_is_treated_as_empty() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(r#"{"review": "I love it"}"#))
            .unwrap();
        let (status, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, neutral_empty());
    }

    #[tokio::test]
    async fn wrong_typed_review_is_treated_as_empty() {
        let (status, body) = call(app(), json_post(r#"{"review": 17}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, neutral_empty());
    }

    #[tokio::test]
    async fn positive_review() {
        let (status, body) = call(
            app(),
            json_post(r#"{"review": "I love this product, it's amazing!"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentiment"], "positive");
        let score = body["score"].as_f64().unwrap();
        assert!(score > 0.0 && score <= 1.0);

        let keywords = body["keywords"].as_array().unwrap();
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= 5);
        assert!(keywords.iter().any(|k| k == "love"));
    }

    #[tokio::test]
    async fn negative_review() {
        let (status, body) = call(
            app(),
            json_post(r#"{"review": "This is the worst purchase I have ever made."}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentiment"], "negative");
        let score = body["score"].as_f64().unwrap();
        assert!(score < 0.0 && score >= -1.0);
    }

    #[tokio::test]
    async fn review_larger_than_two_megabytes_is_analyzed() {
        let review = "I love this product, it is amazing. ".repeat(60_000);
        let body = json!({ "review": review }).to_string();
        assert!(body.len() > 2 * 1024 * 1024);

        let (status, body) = call(app(), json_post(&body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentiment"], "positive");
        assert!(body["score"].as_f64().unwrap() > 0.0);
        assert!(!body["keywords"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn response_has_exactly_three_fields() {
        let (_, body) = call(app(), json_post(r#"{"review": "decent value"}"#)).await;
        let mut fields: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["keywords", "score", "sentiment"]);
    }

    #[tokio::test]
    async fn repeated_requests_agree() {
        let review = r#"{"review": "Fast delivery, but the screen scratches easily."}"#;
        let (_, first) = call(app(), json_post(review)).await;
        let (_, second) = call(app(), json_post(review)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stubbed_boundary_scores_map_to_labels() {
        for (score, label) in [(0.05, "positive"), (-0.05, "negative"), (0.01, "neutral")] {
            let app = app_with(ReviewAnalyzer::new(
                Arc::new(FixedScore(score)),
                Arc::new(EchoWords),
            ));
            let (_, body) = call(app, json_post(r#"{"review": "anything"}"#)).await;
            assert_eq!(body["sentiment"], label, "score {score}");
            assert_eq!(body["score"].as_f64().unwrap(), score);
        }
    }

    #[tokio::test]
    async fn extractor_failure_is_a_server_error() {
        let app = app_with(ReviewAnalyzer::new(
            Arc::new(VaderScorer::new()),
            Arc::new(FailingExtractor),
        ));
        let (status, body) = call(app, json_post(r#"{"review": "great"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("sentiment").is_none());
        assert!(body["message"].as_str().unwrap().contains("onnx session lost"));
    }

    #[tokio::test]
    async fn accelerator_cache_is_cleared_before_each_request() {
        let cache = Arc::new(CountingCache::default());
        let analyzer = ReviewAnalyzer::new(Arc::new(VaderScorer::new()), Arc::new(EchoWords))
            .with_accelerator(cache.clone());
        let app = app_with(analyzer);

        let review = r#"{"review": "Works as described"}"#;
        let (_, with_cache) = call(app.clone(), json_post(review)).await;
        let (_, again) = call(app, json_post(review)).await;
        let (_, without_cache) = call(self::app(), json_post(review)).await;

        assert_eq!(cache.0.load(Ordering::SeqCst), 2);
        assert_eq!(with_cache, again);
        assert_eq!(with_cache, without_cache);
    }

    #[tokio::test]
    async fn cross_origin_requests_are_allowed() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::ORIGIN, "http://example.com")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"review": "ok"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn cors_preflight_succeeds() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/analyze")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn other_routes_are_not_served() {
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
