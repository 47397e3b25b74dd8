//! Integration tests against live LLM providers.
//!
//! These tests make real API calls to OpenRouter.
//! Run with: OPENROUTER_API_KEY=your_key cargo test --test llm_integration -- --ignored

use augment_forge::llm::{build_provider, LlmConfig, ProviderKind, SamplingParams};
use augment_forge::pipeline::{parse_completion, ParseMode};

const TEST_MODEL: &str = "openai/gpt-4o-mini";

fn create_test_config(max_tokens: u32) -> LlmConfig {
    let key = std::env::var("OPENROUTER_API_KEY")
        .expect("OPENROUTER_API_KEY environment variable must be set for integration tests");
    LlmConfig::new(ProviderKind::OpenRouter, TEST_MODEL)
        .with_api_key(key)
        .with_sampling(SamplingParams {
            max_tokens,
            temperature: 0.0,
            top_k: Some(1),
        })
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_completion() {
    let provider = build_provider(&create_test_config(10)).expect("provider should build");

    let completion = provider
        .get_completion("What is 2 + 2? Reply with just the number.")
        .await
        .expect("completion should succeed");

    assert!(
        completion.contains('4'),
        "Response should contain '4', got: {}",
        completion
    );
}

#[tokio::test]
#[ignore]
async fn test_json_completion_parses() {
    let provider = build_provider(&create_test_config(200)).expect("provider should build");

    let completion = provider
        .get_completion(
            "Return a JSON object with keys \"question\" and \"answer\" about the capital of \
             France. Output only the JSON.",
        )
        .await
        .expect("completion should succeed");

    let record = parse_completion(&completion, ParseMode::Extract)
        .unwrap_or_else(|e| panic!("unparseable completion {:?}: {}", completion, e));
    assert!(record.get("question").is_some());
    assert!(record.get("answer").is_some());
}
