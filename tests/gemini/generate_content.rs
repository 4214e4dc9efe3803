use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use software_architect::config::ReviewConfig;
use software_architect::providers::{GeminiProvider, ReviewModel};
use software_architect::review::{ModelReviewer, ReviewType, Reviewer};

fn config(server: &MockServer) -> ReviewConfig {
    ReviewConfig {
        model: "gemini-1.5-pro".into(),
        api_key: Some("AIza-test-key".into()),
        api_base: server.uri(),
        temperature: 0.2,
        timeout_secs: 5,
    }
}

fn candidate(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn provider_posts_generate_content_with_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(header("x-goog-api-key", "AIza-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{\"approved\":true}")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&config(&server));
    let text = provider.generate("system", "review this").await.unwrap();
    assert_eq!(text, "{\"approved\":true}");

    let received = server
        .received_requests()
        .await
        .expect("mock server should record received requests");
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "review this");
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert!(!received[0].url.as_str().contains("AIza"));
    server.verify().await;
}

#[tokio::test]
async fn api_errors_are_sanitized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("{\"error\":{\"message\":\"API key AIzaSyLEAKED is invalid\"}}"),
        )
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&config(&server));
    let err = provider.generate("system", "prompt").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("403"));
    assert!(!message.contains("AIzaSyLEAKED"));
}

#[tokio::test]
async fn model_reviewer_maps_gemini_reply_to_review() {
    let server = MockServer::start().await;
    let reply = json!({
        "approved": true,
        "feedback": {
            "summary": "Good implementation plan",
            "issues": [],
            "suggestions": ["Consider adding error handling"],
            "strengths": ["Clear structure", "Good separation of concerns"]
        },
        "metadata": {"confidence": 0.8}
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&reply.to_string())))
        .mount(&server)
        .await;

    let reviewer = ModelReviewer::new(GeminiProvider::new(&config(&server))).unwrap();
    let review = reviewer
        .review_plan(
            "test-123",
            "Implement user authentication",
            "Use JWT tokens with refresh token rotation",
            "Express.js API with PostgreSQL",
        )
        .await
        .unwrap();

    assert!(review.approved);
    assert_eq!(review.review_type, ReviewType::Plan);
    assert_eq!(review.metadata.model_used, "gemini-1.5-pro");
    assert_eq!(review.metadata.task_id, "test-123");
    assert!((review.metadata.confidence - 0.8).abs() < f64::EPSILON);
}

#[tokio::test]
async fn server_failure_surfaces_as_review_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let reviewer = ModelReviewer::new(GeminiProvider::new(&config(&server))).unwrap();
    let err = reviewer
        .review_implementation("t-1", "d", "p", "s", "+diff")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "REVIEW_SERVICE_ERROR");
}
