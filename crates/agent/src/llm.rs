use std::time::Duration;

use apex_core::config::LlmConfig;
use apex_core::domain::message::{Message, Role};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<Message>,
    /// Empty means the model is not bound to any tools.
    pub tools: Vec<ToolSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), tool_calls: Vec::new() }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not parse model response: {0}")]
    Parse(String),
    #[error("model call timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    /// Returns `None` when no usable credential is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        if !config.has_credential() {
            return Ok(None);
        }
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        Self::new(api_key, config.base_url.clone(), Duration::from_secs(config.timeout_secs))
            .map(Some)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&build_request_body(&request))
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let payload: GeminiResponse =
            response.json().await.map_err(|error| LlmError::Parse(error.to_string()))?;
        parse_response(payload)
    }
}

fn build_request_body(request: &CompletionRequest) -> Value {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in &request.messages {
        match message.role {
            Role::System => system_parts.push(json!({ "text": message.content })),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{ "text": message.content }],
            })),
            Role::Assistant if !message.content.is_empty() => contents.push(json!({
                "role": "model",
                "parts": [{ "text": message.content }],
            })),
            Role::Assistant => {}
        }
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "temperature": request.temperature },
    });
    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }
    if !request.tools.is_empty() {
        body["tools"] = json!([{ "function_declarations": request.tools }]);
    }
    body
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

fn parse_response(response: GeminiResponse) -> Result<Completion, LlmError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("no candidates in response".to_string()))?;

    let mut completion = Completion::default();
    for part in candidate.content.map(|content| content.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            completion.content.push_str(&text);
        }
        if let Some(call) = part.function_call {
            completion.tool_calls.push(ToolCall {
                name: call.name,
                arguments: call.args.unwrap_or_else(|| Value::Object(Map::new())),
            });
        }
    }
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use apex_core::domain::message::Message;
    use serde_json::json;

    use super::{build_request_body, parse_response, CompletionRequest, GeminiResponse, ToolSpec};

    #[test]
    fn request_body_maps_roles_and_tools() {
        let request = CompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.3,
            messages: vec![
                Message::system("You are a claims agent."),
                Message::user("status of CLM-1?"),
                Message::assistant("Checking."),
                Message::assistant(""),
            ],
            tools: vec![ToolSpec {
                name: "lookup_claim_status".to_string(),
                description: "Look up a claim".to_string(),
                parameters: json!({"type": "object"}),
            }],
        };

        let body = build_request_body(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a claims agent.");
        assert_eq!(body["contents"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["tools"][0]["function_declarations"][0]["name"], "lookup_claim_status");
    }

    #[test]
    fn request_body_omits_tools_when_unbound() {
        let request = CompletionRequest {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.0,
            messages: vec![Message::user("hi")],
            tools: Vec::new(),
        };

        let body = build_request_body(&request);

        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn function_call_parts_become_tool_calls() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Let me check. "},
                        {"functionCall": {"name": "lookup_claim_status", "args": {"claim_number": "CLM-1"}}},
                    ]
                }
            }]
        }))
        .expect("response");

        let completion = parse_response(response).expect("completion");

        assert_eq!(completion.content, "Let me check. ");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].arguments["claim_number"], "CLM-1");
    }

    #[test]
    fn empty_candidates_is_a_parse_error() {
        let response: GeminiResponse = serde_json::from_value(json!({})).expect("response");

        assert!(parse_response(response).is_err());
    }
}
