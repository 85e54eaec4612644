use httpmock::prelude::*;
use linerun::config::{ApiKey, EvaluatorConfig};
use linerun::evaluate::{
    EvaluationRequest, EvaluationSource, Evaluator, RemoteEvaluator, score_locally,
};
use serde_json::json;

const SOURCE: &str = "我昨天在商场见到了你的前任。";
const TARGET: &str = "I saw your ex at the mall yesterday.";
const ATTEMPT: &str = "I go market yesterday";

fn evaluator(endpoint: String) -> RemoteEvaluator {
    let config = EvaluatorConfig {
        endpoint,
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..EvaluatorConfig::default()
    };
    RemoteEvaluator::new(config, ApiKey::new("test-key").unwrap()).unwrap()
}

fn request() -> EvaluationRequest {
    EvaluationRequest::new(ATTEMPT, SOURCE, TARGET).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": content }
        }]
    })
}

#[tokio::test]
async fn structured_reply_is_decoded() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", "Bearer test-key")
            .body_contains("glm-4-flash")
            .body_contains(ATTEMPT);
        then.status(200).json_body(completion(
            r#"{"score":2,"rating":"需要改进","originalText":"I saw your ex at the mall yesterday.","feedback":"Use the past tense 'went'.","grammarTips":["go -> went","go to the market"]}"#,
        ));
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    mock.assert_async().await;
    assert_eq!(source, EvaluationSource::Remote);
    assert_eq!(result.score, 2);
    assert_eq!(result.rating, "需要改进");
    assert_eq!(result.original_text, TARGET);
    assert_eq!(result.feedback.as_deref(), Some("Use the past tense 'went'."));
    assert_eq!(result.grammar_tips, vec!["go -> went", "go to the market"]);
}

#[tokio::test]
async fn out_of_range_remote_score_is_clamped() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(completion(r#"{"score":10}"#));
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Remote);
    assert_eq!(result.score, 5);
    assert_eq!(result.rating, "一般");
    assert_eq!(result.original_text, TARGET);
    assert!(result.grammar_tips.is_empty());
}

#[tokio::test]
async fn prose_reply_becomes_degraded_result() {
    let prose = "这个翻译表达了大致意思，但时态不对，应该用过去式 went。";
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(completion(prose));
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Degraded);
    assert_eq!(result.score, 3);
    assert_eq!(result.rating, "一般");
    assert_eq!(result.original_text, TARGET);
    assert_eq!(result.feedback.as_deref(), Some(prose));
    assert!(result.grammar_tips.is_empty());
}

#[tokio::test]
async fn service_error_payload_falls_back_to_local() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(401).json_body(json!({
            "error": { "code": "1001", "message": "Authentication failed" }
        }));
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Local);
    assert!((1..=5).contains(&result.score));
    assert_eq!(result, score_locally(ATTEMPT, TARGET));
}

#[tokio::test]
async fn error_payload_with_success_status_falls_back_to_local() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({ "error": { "message": "quota exceeded" } }));
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Local);
    assert_eq!(result, score_locally(ATTEMPT, TARGET));
}

#[tokio::test]
async fn non_json_error_page_falls_back_to_local() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(502).body("<html>Bad Gateway</html>");
    }).await;

    let (result, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Local);
    assert_eq!(result.score, 1);
    assert_eq!(result.rating, "需要改进");
}

#[tokio::test]
async fn empty_choices_fall_back_to_local() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({ "choices": [] }));
    }).await;

    let (_, source) = evaluator(server.url("/chat/completions"))
        .evaluate_detailed(&request())
        .await;

    assert_eq!(source, EvaluationSource::Local);
}

#[tokio::test]
async fn connection_refused_matches_local_scorer() {
    // Nothing listens on port 1
    let remote = evaluator("http://127.0.0.1:1/chat/completions".to_string());

    let (result, source) = remote.evaluate_detailed(&request()).await;

    assert_eq!(source, EvaluationSource::Local);
    assert_eq!(result, score_locally(ATTEMPT, TARGET));
}

#[tokio::test]
async fn exact_match_offline_fallback_is_perfect() {
    let remote = evaluator("http://127.0.0.1:1/chat/completions".to_string());
    let request = EvaluationRequest::new("Yes, please.", "好的，谢谢。", "Yes, please.").unwrap();

    let result = remote.evaluate(&request).await;

    assert_eq!(result.score, 5);
    assert_eq!(result.rating, "完美！");
}
