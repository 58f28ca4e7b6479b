use std::time::Duration;

use enrich_core::WorkItem;
use enrich_engine::{
    AnthropicEnricher, EnrichFailureKind, EnrichSettings, Enricher, PromptTemplate,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> EnrichSettings {
    EnrichSettings {
        base_url: server.uri(),
        prompt: PromptTemplate::new("Describe {name}: {payload}"),
        ..EnrichSettings::new("test-key")
    }
}

fn message(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    })
}

fn item() -> WorkItem {
    WorkItem::new("Workday", "HR and payroll suite")
}

#[tokio::test]
async fn returns_parsed_record_and_sends_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 4000,
            "messages": [
                { "role": "user", "content": "Describe Workday: HR and payroll suite" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message(
            "```json\n{\"vendor_name\": \"Workday, Inc.\", \"features\": []}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(settings(&server)).unwrap();
    let record = enricher.enrich(&item()).await.expect("enrich ok");
    assert_eq!(record.0["vendor_name"], "Workday, Inc.");
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(message("{\"vendor_name\": \"Workday\"}")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(EnrichSettings {
        base_url: format!("{}/anthropic", server.uri()),
        ..settings(&server)
    })
    .unwrap();
    let record = enricher.enrich(&item()).await.expect("enrich ok");
    assert_eq!(record.0["vendor_name"], "Workday");
}

#[tokio::test]
async fn http_errors_keep_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(settings(&server)).unwrap();
    let err = enricher.enrich(&item()).await.unwrap_err();
    assert_eq!(err.kind, EnrichFailureKind::HttpStatus(429));
    assert!(err.message.contains("rate limited"));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(message("{}")),
        )
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(EnrichSettings {
        request_timeout: Duration::from_millis(50),
        ..settings(&server)
    })
    .unwrap();
    let err = enricher.enrich(&item()).await.unwrap_err();
    assert_eq!(err.kind, EnrichFailureKind::Timeout);
}

#[tokio::test]
async fn unparseable_answers_are_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(message("Sorry, I don't know this product.")),
        )
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(settings(&server)).unwrap();
    let err = enricher.enrich(&item()).await.unwrap_err();
    assert_eq!(err.kind, EnrichFailureKind::InvalidJson);
}

#[tokio::test]
async fn answers_without_text_are_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
        .mount(&server)
        .await;

    let enricher = AnthropicEnricher::new(settings(&server)).unwrap();
    let err = enricher.enrich(&item()).await.unwrap_err();
    assert_eq!(err.kind, EnrichFailureKind::EmptyResponse);
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = AnthropicEnricher::new(EnrichSettings {
        base_url: "not a url".to_string(),
        ..EnrichSettings::new("k")
    })
    .unwrap_err();
    assert_eq!(err.kind, EnrichFailureKind::InvalidRequest);
}
