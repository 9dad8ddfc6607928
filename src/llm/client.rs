//! HTTP transport for the chat-completions API.

use crate::config::ApiConfig;
use crate::error::CoachError;
use crate::llm::sse::{self, SseParser};
use crate::llm::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Update channel capacity; bounds memory if the consumer lags.
const STREAM_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the chat-completions endpoint. `stream` and the tool
/// fields are omitted from the wire format when unset.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatRequest {
    /// Streaming two-message request.
    pub fn streaming(config: &ApiConfig, system: &str, user: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: Some(true),
            tools: None,
            tool_choice: None,
        }
    }

    /// Single-shot request that forces `tool` to be invoked.
    pub fn with_tool(
        config: &ApiConfig,
        system: &str,
        user: &str,
        tool: ToolDefinition,
        tool_choice: serde_json::Value,
    ) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: None,
            tools: Some(vec![tool]),
            tool_choice: Some(tool_choice),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// One event from an open completion stream.
#[derive(Debug)]
pub enum StreamUpdate {
    /// Incremental content delta.
    Content(String),
    /// The stream ended normally.
    Done,
    /// The stream failed; nothing follows.
    Error(CoachError),
}

/// Transport seam for the chat-completions API, swappable in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Single request/response completion.
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, CoachError>;

    /// Open a streaming completion. Updates arrive on the returned channel
    /// in delivery order, ending with exactly one `Done` or `Error`.
    async fn open_stream(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamUpdate>, CoachError>;
}

/// Live client for an OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, CoachError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("chat completion failed: {} {}", status, body);
            return Err(CoachError::api(status.as_u16(), body));
        }
        Ok(response)
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(crate::config::OPENAI_ENDPOINT)
    }
}

#[async_trait]
impl ChatTransport for OpenAiClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, CoachError> {
        let response = self.post(api_key, request).await?;
        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|err| CoachError::network(err.to_string()))?;
        Ok(parsed)
    }

    async fn open_stream(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamUpdate>, CoachError> {
        let response = self.post(api_key, request).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut byte_stream = response.bytes_stream();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx
                            .send(StreamUpdate::Error(CoachError::network(err.to_string())))
                            .await;
                        return;
                    }
                };

                for payload in parser.push(&chunk) {
                    if payload == sse::DONE_PAYLOAD {
                        let _ = tx.send(StreamUpdate::Done).await;
                        return;
                    }
                    if let Some(delta) = sse::parse_content_delta(&payload) {
                        if tx.send(StreamUpdate::Content(delta)).await.is_err() {
                            // Receiver gone, stop reading.
                            return;
                        }
                    }
                }
            }

            // Connection closed without a [DONE] sentinel.
            let _ = tx.send(StreamUpdate::Done).await;
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::default()
    }

    #[test]
    fn test_streaming_request_serializes() {
        let request = ChatRequest::streaming(&config(), "system text", "user text");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "user text");
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_request_omits_stream_flag() {
        let request = ChatRequest::with_tool(
            &config(),
            "system",
            "user",
            crate::llm::tools::generation_tool(),
            crate::llm::tools::generation_tool_choice(),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("stream").is_none());
        assert_eq!(value["tools"].as_array().unwrap().len(), 1);
        assert_eq!(
            value["tool_choice"]["function"]["name"],
            crate::llm::tools::GENERATION_TOOL_NAME
        );
    }

    #[test]
    fn test_chat_response_parses_content() {
        let raw = r#"{
            "choices": [{ "message": { "content": "答えです" } }]
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("答えです")
        );
        assert!(response.choices[0].message.tool_calls.is_none());
    }

    #[test]
    fn test_chat_response_parses_tool_calls() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "submit_generated_code",
                            "arguments": "{\"isValidRequest\":true,\"code\":\"x\"}"
                        }
                    }]
                }
            }]
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let calls = response.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "submit_generated_code");
    }
}
