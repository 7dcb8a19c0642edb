//! Converse API client for the hosted model.
//!
//! The [`ModelClient`] trait decouples the pipeline from the HTTP endpoint.
//! Tests use scripted clients that return predetermined replies without
//! touching the network.

use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::config::ModelConfig;

/// Errors from the Converse endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("throttled (retry after {retry_after:?}s)")]
    Throttled { retry_after: Option<u64> },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: set {0}")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBlock {
    /// Non-text blocks (reasoning, tool use) deserialize with empty text.
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock { text: text.into() }],
        }
    }

    /// Concatenated text of every content block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl From<&ModelConfig> for InferenceConfig {
    fn from(cfg: &ModelConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
        }
    }
}

/// Request body for `POST /model/{modelId}/converse`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemBlock>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    GuardrailIntervened,
    ContentFiltered,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConverseOutput {
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub output: ConverseOutput,
    pub stop_reason: StopReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ConverseResponse {
    pub fn text(&self) -> String {
        self.output.message.text()
    }
}

/// Abstraction over Converse backends.
pub trait ModelClient {
    /// Send one Converse request and return the parsed reply.
    fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse>;
}

impl<C: ModelClient + ?Sized> ModelClient for &C {
    fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        (**self).converse(request)
    }
}

/// Blocking Converse client authenticated with a bearer API key.
pub struct BedrockClient {
    agent: ureq::Agent,
    endpoint: String,
    model_id: String,
    api_key: String,
}

impl BedrockClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey(cfg.api_key_env.clone()))?;
        Ok(Self::new(api_key, cfg))
    }

    pub fn new(api_key: String, cfg: &ModelConfig) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_recv_response(Some(cfg.read_timeout()))
            .timeout_recv_body(Some(cfg.read_timeout()))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: cfg.endpoint(),
            model_id: cfg.model_id.clone(),
            api_key,
        }
    }

    fn converse_url(&self) -> String {
        format!(
            "{}/model/{}/converse",
            self.endpoint,
            urlencoding::encode(&self.model_id)
        )
    }
}

impl ModelClient for BedrockClient {
    #[instrument(skip_all, fields(model_id = %self.model_id, messages = request.messages.len()))]
    fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        let started = Instant::now();
        let url = self.converse_url();
        debug!(%url, "sending converse request");

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send_json(request)
            .map_err(ModelError::Http)?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            warn!(?retry_after, "converse request throttled");
            return Err(ModelError::Throttled { retry_after }.into());
        }
        if status >= 400 {
            let message = response
                .body_mut()
                .read_to_string()
                .unwrap_or_else(|_| "(no body)".to_string());
            warn!(status, "converse request rejected");
            return Err(ModelError::Api { status, message }.into());
        }

        let parsed: ConverseResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| ModelError::InvalidResponse(format!("parse converse body: {err}")))?;

        let usage = parsed.usage.unwrap_or_default();
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stop_reason = ?parsed.stop_reason,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "converse complete"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeConverseServer, FakeResponse, converse_body};
    use serde_json::json;

    fn local_config(endpoint: &str) -> ModelConfig {
        ModelConfig {
            endpoint_url: Some(endpoint.to_string()),
            read_timeout_secs: 5,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn request_serializes_with_converse_field_names() {
        let request = ConverseRequest {
            messages: vec![Message::user("hi")],
            system: vec![SystemBlock {
                text: "be terse".to_string(),
            }],
            inference_config: InferenceConfig::from(&ModelConfig::default()),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"][0]["text"], "hi");
        assert_eq!(value["system"][0]["text"], "be terse");
        assert_eq!(value["inferenceConfig"]["maxTokens"], 4096);
        let top_p = value["inferenceConfig"]["topP"].as_f64().expect("topP");
        assert!((top_p - 0.9).abs() < 1e-6);
    }

    #[test]
    fn response_parses_stop_reason_and_usage() {
        let response: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "a"}, {"text": "b"}]}},
            "stopReason": "max_tokens",
            "usage": {"inputTokens": 3, "outputTokens": 4, "totalTokens": 7}
        }))
        .expect("parse");

        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.text(), "ab");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(7));
    }

    #[test]
    fn unknown_stop_reason_maps_to_other() {
        let response: ConverseResponse = serde_json::from_value(json!({
            "output": {"message": {"role": "assistant", "content": [{"reasoningContent": {}}]}},
            "stopReason": "something_new"
        }))
        .expect("parse");
        assert_eq!(response.stop_reason, StopReason::Other);
        assert_eq!(response.text(), "");
    }

    #[test]
    fn model_id_is_url_encoded() {
        let client = BedrockClient::new("key".to_string(), &ModelConfig::default());
        assert_eq!(
            client.converse_url(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/us.amazon.nova-premier-v1%3A0/converse"
        );
    }

    #[test]
    fn posts_bearer_authenticated_request() {
        let server = FakeConverseServer::start(vec![(200, converse_body("hello", "end_turn"))]);
        let client = BedrockClient::new("secret".to_string(), &local_config(&server.url()));
        let request = ConverseRequest {
            messages: vec![Message::user("ping")],
            system: Vec::new(),
            inference_config: InferenceConfig::from(&ModelConfig::default()),
        };

        let response = client.converse(&request).expect("converse");
        assert_eq!(response.text(), "hello");

        let captured = server.finish();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].path.ends_with("/converse"));
        assert_eq!(
            captured[0].header("authorization").as_deref(),
            Some("Bearer secret")
        );
        assert_eq!(captured[0].json()["messages"][0]["content"][0]["text"], "ping");
    }

    #[test]
    fn error_status_surfaces_api_error() {
        let server = FakeConverseServer::start(vec![(403, json!({"message": "denied"}))]);
        let client = BedrockClient::new("secret".to_string(), &local_config(&server.url()));
        let request = ConverseRequest {
            messages: vec![Message::user("ping")],
            system: Vec::new(),
            inference_config: InferenceConfig::from(&ModelConfig::default()),
        };

        let err = client.converse(&request).unwrap_err();
        match err.downcast_ref::<ModelError>() {
            Some(ModelError::Api { status, message }) => {
                assert_eq!(*status, 403);
                assert!(message.contains("denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.finish();
    }

    #[test]
    fn too_many_requests_is_reported_as_throttling() {
        let server = FakeConverseServer::start_with(vec![
            FakeResponse::json(429, json!({"message": "slow down"})).with_header("Retry-After", "7"),
            FakeResponse::json(429, json!({"message": "slow down"})),
        ]);
        let client = BedrockClient::new("secret".to_string(), &local_config(&server.url()));
        let request = ConverseRequest {
            messages: vec![Message::user("ping")],
            system: Vec::new(),
            inference_config: InferenceConfig::from(&ModelConfig::default()),
        };

        let err = client.converse(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::Throttled { retry_after: Some(7) })
        ));
        let err = client.converse(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::Throttled { retry_after: None })
        ));
        assert_eq!(server.finish().len(), 2);
    }

    #[test]
    fn missing_key_is_reported_by_variable_name() {
        let cfg = ModelConfig {
            api_key_env: "CONVERTER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ModelConfig::default()
        };
        let err = BedrockClient::from_config(&cfg).err().expect("missing key");
        assert!(err.to_string().contains("CONVERTER_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
