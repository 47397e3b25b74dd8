//! HTTP-level tests for the completion providers and the dataset hub client,
//! run against a local mock server.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use augment_forge::dataset::{DatasetSource, HubDatasetSource};
use augment_forge::error::{ConfigError, DatasetError, LlmError};
use augment_forge::llm::{build_provider, LlmConfig, ProviderKind};

fn chat_response(content: &str) -> Value {
    json!({
        "id": "cmpl-1",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
    })
}

fn config(kind: ProviderKind, server: &MockServer) -> LlmConfig {
    LlmConfig::new(kind, "test-model")
        .with_server_base(format!("{}/v1", server.uri()))
        .with_api_key("test-key")
}

async fn last_request_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let request = requests.last().expect("one request");
    serde_json::from_slice(&request.body).expect("json body")
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 32,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("{\"a\": 1}")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::OpenAi, &server)).expect("provider");
    let completion = provider.get_completion("Hello").await.expect("completion");

    assert_eq!(completion, "{\"a\": 1}");
    let body = last_request_body(&server).await;
    assert!(body.get("top_k").is_none());
}

#[tokio::test]
async fn test_vllm_sends_top_k_without_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"top_k": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = LlmConfig::new(ProviderKind::Vllm, "test-model")
        .with_server_base(format!("{}/v1", server.uri()));
    let provider = build_provider(&config).expect("vllm needs no key");
    assert_eq!(provider.get_completion("hi").await.expect("completion"), "ok");

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_openrouter_sends_attribution_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("x-title", "augment-forge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::OpenRouter, &server)).expect("provider");
    assert_eq!(provider.get_completion("hi").await.expect("completion"), "ok");
}

#[tokio::test]
async fn test_rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::OpenAi, &server)).expect("provider");
    let err = provider.get_completion("hi").await.expect_err("429");
    assert!(matches!(err, LlmError::RateLimited(ref m) if m == "slow down"));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::Vllm, &server)).expect("provider");
    let err = provider.get_completion("hi").await.expect_err("500");
    assert!(matches!(err, LlmError::ApiError { code: 500, ref message } if message == "boom"));
}

#[tokio::test]
async fn test_empty_choices_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::OpenAi, &server)).expect("provider");
    let err = provider.get_completion("hi").await.expect_err("no choices");
    assert!(matches!(err, LlmError::ParseError(_)));
}

#[tokio::test]
async fn test_anthropic_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "top_k": 100,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "{\"q\": \"x\"}"}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::Anthropic, &server)).expect("provider");
    assert_eq!(
        provider.get_completion("Hello").await.expect("completion"),
        "{\"q\": \"x\"}"
    );
}

#[test]
fn test_missing_api_key_is_a_config_error() {
    let config = LlmConfig::new(ProviderKind::Anthropic, "m").with_api_key("");
    if std::env::var("ANTHROPIC_API_KEY").map_or(true, |k| k.trim().is_empty()) {
        assert!(matches!(
            build_provider(&config),
            Err(ConfigError::MissingApiKey { env_var: "ANTHROPIC_API_KEY", .. })
        ));
    }
}

fn rows_page(start: usize, count: usize, total: usize) -> Value {
    let rows: Vec<Value> = (start..start + count)
        .map(|i| json!({"row_idx": i, "row": {"id": i, "text": format!("chunk {}", i)}, "truncated_cells": []}))
        .collect();
    json!({"features": [], "rows": rows, "num_rows_total": total, "num_rows_per_page": 100})
}

#[tokio::test]
async fn test_hub_source_pages_until_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .and(query_param("dataset", "org/data"))
        .and(query_param("split", "train"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows_page(0, 100, 130)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows_page(100, 30, 130)))
        .expect(1)
        .mount(&server)
        .await;

    let source = HubDatasetSource::new(None)
        .expect("client")
        .with_base_url(server.uri());
    let dataset = source.load("org/data", "train").await.expect("dataset");

    assert_eq!(dataset.len(), 130);
    assert_eq!(
        dataset.records()[129].get("text").and_then(Value::as_str),
        Some("chunk 129")
    );
}

#[tokio::test]
async fn test_hub_source_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "The dataset does not exist."})),
        )
        .mount(&server)
        .await;

    let source = HubDatasetSource::new(Some("hf_token".to_string()))
        .expect("client")
        .with_base_url(server.uri());
    let err = source.load("org/missing", "train").await.expect_err("404");
    assert!(matches!(err, DatasetError::NotFound(ref m) if m.contains("does not exist")));
}

fn truncated_page(row_idx: usize, total: usize) -> Value {
    json!({
        "rows": [{"row_idx": row_idx, "row": {"text": "first bytes"}, "truncated_cells": ["text"]}],
        "num_rows_total": total
    })
}

#[tokio::test]
async fn test_hub_source_refetches_truncated_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .and(query_param("length", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(truncated_page(0, 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .and(query_param("offset", "0"))
        .and(query_param("length", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [{"row_idx": 0, "row": {"text": "first bytes and the rest"}, "truncated_cells": []}],
            "num_rows_total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = HubDatasetSource::new(None)
        .expect("client")
        .with_base_url(server.uri());
    let dataset = source.load("org/data", "train").await.expect("dataset");

    assert_eq!(dataset.len(), 1);
    assert_eq!(
        dataset.records()[0].get("text").and_then(Value::as_str),
        Some("first bytes and the rest")
    );
}

#[tokio::test]
async fn test_hub_source_rejects_rows_that_stay_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(truncated_page(0, 1)))
        .mount(&server)
        .await;

    let source = HubDatasetSource::new(None)
        .expect("client")
        .with_base_url(server.uri());
    let err = source.load("org/data", "train").await.expect_err("truncated");

    assert!(matches!(
        err,
        DatasetError::TruncatedRow { row: 0, ref cells, .. } if cells == &["text".to_string()]
    ));
    assert!(err.to_string().contains("text"));
}

#[tokio::test]
async fn test_openai_empty_content_is_returned_as_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("")))
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::OpenAi, &server)).expect("provider");
    assert_eq!(provider.get_completion("Hello").await.expect("completion"), "");
}

#[tokio::test]
async fn test_anthropic_empty_text_is_returned_as_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_2",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": ""}],
            "stop_reason": "end_turn"
        })))
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::Anthropic, &server)).expect("provider");
    assert_eq!(provider.get_completion("Hello").await.expect("completion"), "");
}

#[tokio::test]
async fn test_anthropic_without_text_blocks_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_3",
            "type": "message",
            "role": "assistant",
            "content": [],
            "stop_reason": "max_tokens"
        })))
        .mount(&server)
        .await;

    let provider = build_provider(&config(ProviderKind::Anthropic, &server)).expect("provider");
    let err = provider.get_completion("Hello").await.expect_err("no text");
    assert!(matches!(err, LlmError::ParseError(_)));
}
