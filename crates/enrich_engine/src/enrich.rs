use std::fmt;
use std::time::Duration;

use enrich_core::WorkItem;
use enrich_logging::enrich_debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Structured data returned by enrichment. Opaque to the batch controller.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord(pub Value);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichFailureKind {
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    EmptyResponse,
    InvalidJson,
}

impl fmt::Display for EnrichFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichFailureKind::InvalidRequest => write!(f, "invalid request"),
            EnrichFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            EnrichFailureKind::Timeout => write!(f, "timeout"),
            EnrichFailureKind::Network => write!(f, "network error"),
            EnrichFailureKind::EmptyResponse => write!(f, "empty response"),
            EnrichFailureKind::InvalidJson => write!(f, "invalid json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EnrichError {
    pub kind: EnrichFailureKind,
    pub message: String,
}

impl EnrichError {
    pub fn new(kind: EnrichFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Turns one work item into a structured record, or fails.
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, item: &WorkItem) -> Result<EnrichedRecord, EnrichError>;
}

/// Prompt text with `{name}` and `{payload}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Single pass, so placeholder text inside a name or payload stays literal.
    pub fn render(&self, item: &WorkItem) -> String {
        let mut out = String::with_capacity(self.0.len() + item.payload.len());
        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{name}") {
                out.push_str(&item.name);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{payload}") {
                out.push_str(&item.payload);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

const DEFAULT_PROMPT: &str = r#"You are a software intelligence expert. Analyze this enterprise software product and extract comprehensive metadata.

SOFTWARE: {name}
DESCRIPTION: {payload}

Extract the following information as a single JSON object:

{
  "vendor_name": "Company that makes this software",
  "category": "ERP/Financial | CRM | ITSM/Service Desk | Productivity Suite | Collaboration | Project Management | Business Intelligence | Cloud Infrastructure | HR/HCM | Marketing | Development Tools | Security | Data/Analytics | Other",
  "subcategory": "More specific category if applicable",
  "pricing": {
    "license_type": "Per User | Per Month | Usage Based | Flat Fee | Enterprise",
    "estimated_annual_cost_range": { "min": 50000, "max": 500000 },
    "cost_per_user": 31.25
  },
  "usage": {
    "estimated_total_licenses": 1000,
    "estimated_active_users": 850,
    "utilization_rate": 85.0
  },
  "business_context": {
    "primary_use_case": "One sentence describing main purpose",
    "business_criticality": "mission-critical | high | medium | low"
  },
  "technical": {
    "deployment_type": "Cloud | On-Premise | Hybrid",
    "integration_complexity": "low | medium | high | critical",
    "api_available": true
  },
  "replacement": {
    "replacement_priority": "immediate | high | medium | low | never",
    "ai_replacement_candidate": true,
    "workflow_automation_potential": "high | medium | low | none"
  },
  "features": [
    { "feature_name": "Task Management", "category": "Task Management", "description": "Create and assign tasks", "is_core": true }
  ]
}

Be realistic and specific. Return ONLY valid JSON, no markdown formatting."#;

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub base_url: String,
    pub api_key: String,
    pub api_version: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub prompt: PromptTemplate,
}

impl EnrichSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: api_key.into(),
            api_version: "2023-06-01".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            prompt: PromptTemplate::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Enrichment through the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicEnricher {
    settings: EnrichSettings,
    endpoint: Url,
    client: reqwest::Client,
}

impl AnthropicEnricher {
    pub fn new(settings: EnrichSettings) -> Result<Self, EnrichError> {
        let endpoint = messages_endpoint(&settings.base_url)
            .map_err(|err| EnrichError::new(EnrichFailureKind::InvalidRequest, err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(build_headers(&settings)?)
            .build()
            .map_err(|err| EnrichError::new(EnrichFailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            endpoint,
            client,
        })
    }

    fn request_body(&self, item: &WorkItem) -> Value {
        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": [
                { "role": "user", "content": self.settings.prompt.render(item) }
            ]
        })
    }
}

fn build_headers(settings: &EnrichSettings) -> Result<HeaderMap, EnrichError> {
    let invalid = |err: reqwest::header::InvalidHeaderValue| {
        EnrichError::new(EnrichFailureKind::InvalidRequest, err.to_string())
    };
    let mut headers = HeaderMap::new();
    let mut api_key = HeaderValue::from_str(&settings.api_key).map_err(invalid)?;
    api_key.set_sensitive(true);
    headers.insert("x-api-key", api_key);
    headers.insert(
        "anthropic-version",
        HeaderValue::from_str(&settings.api_version).map_err(invalid)?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[async_trait::async_trait]
impl Enricher for AnthropicEnricher {
    async fn enrich(&self, item: &WorkItem) -> Result<EnrichedRecord, EnrichError> {
        let body = self.request_body(item).to_string();
        enrich_debug!("Enriching {:?} via {}", item.name, self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EnrichError::new(
                EnrichFailureKind::HttpStatus(status.as_u16()),
                truncate(&detail, 200),
            ));
        }

        let text = response.text().await.map_err(map_reqwest_error)?;
        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|err| EnrichError::new(EnrichFailureKind::InvalidJson, err.to_string()))?;
        let answer = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| EnrichError::new(EnrichFailureKind::EmptyResponse, "no text content"))?;

        parse_record(&answer)
    }
}

/// Parse model output into a record. Surrounding Markdown fences are ignored;
/// anything but a JSON object is rejected.
/// `v1/messages` under `base_url`, keeping any path prefix a proxy adds.
fn messages_endpoint(base_url: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let prefixed = format!("{}/", base.path());
        base.set_path(&prefixed);
    }
    base.join("v1/messages")
}

pub fn parse_record(answer: &str) -> Result<EnrichedRecord, EnrichError> {
    let cleaned = strip_code_fences(answer);
    let value: Value = serde_json::from_str(cleaned).map_err(|err| {
        EnrichError::new(
            EnrichFailureKind::InvalidJson,
            format!("{err}; response starts with {:?}", truncate(cleaned, 200)),
        )
    })?;
    if !value.is_object() {
        return Err(EnrichError::new(
            EnrichFailureKind::InvalidJson,
            "expected a JSON object",
        ));
    }
    Ok(EnrichedRecord(value))
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the opening fence line, which may carry a language tag.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> EnrichError {
    if err.is_timeout() {
        return EnrichError::new(EnrichFailureKind::Timeout, err.to_string());
    }
    EnrichError::new(EnrichFailureKind::Network, err.to_string())
}
