/// LLM Client — the single point of entry for all language-model calls in the matcher.
///
/// No other module talks to the provider directly. Pipeline stages depend on the
/// `LanguageModel` trait so tests can script responses without a network.
///
/// Provider: Groq's OpenAI-compatible chat-completions endpoint, temperature 0.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(&'static str),
}

impl LlmError {
    /// True when the provider answered but declined to produce content.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            LlmError::Api { .. } | LlmError::EmptyContent | LlmError::InvalidPrompt(_)
        )
    }
}

/// Anything that can answer a system/user prompt pair with raw text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one prompt pair. With `structured` set, the provider is asked to
    /// constrain output to a single JSON object. The text is returned as-is.
    async fn invoke(&self, system: &str, user: &str, structured: bool)
        -> Result<String, LlmError>;
}

/// Calls the model in structured mode and decodes the reply into `T`.
/// The system prompt must describe the JSON schema of `T`.
pub async fn call_json<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    system: &str,
    user: &str,
) -> Result<T, LlmError> {
    let text = llm.invoke(system, user, true).await?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }

    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Connection settings for the hosted model. The credential is passed in
/// explicitly; the client never reads the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Extra attempts on 429 / 5xx. Zero means a single attempt.
    pub max_retries: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if the provider sent any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Chat-completions client for Groq (or any OpenAI-compatible endpoint).
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: GatewayConfig,
}

impl LlmClient {
    pub fn new(config: GatewayConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        structured: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: structured.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }

    /// Makes a raw call to the provider, returning the full response object.
    /// Retries on 429 and 5xx with exponential backoff when `max_retries > 0`.
    pub async fn call(
        &self,
        system: &str,
        user: &str,
        structured: bool,
    ) -> Result<ChatResponse, LlmError> {
        if system.trim().is_empty() {
            return Err(LlmError::InvalidPrompt("system prompt is empty"));
        }
        if user.trim().is_empty() {
            return Err(LlmError::InvalidPrompt("user prompt is empty"));
        }

        let request_body = self.build_request(system, user, structured);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(6)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout {
                        secs: self.config.timeout.as_secs(),
                    });
                    continue;
                }
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(if status.as_u16() == 429 {
                    LlmError::RateLimited { retries: attempt }
                } else {
                    LlmError::Api {
                        status: status.as_u16(),
                        message: provider_message(body),
                    }
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: provider_message(body),
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.config.max_retries,
        }))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn invoke(
        &self,
        system: &str,
        user: &str,
        structured: bool,
    ) -> Result<String, LlmError> {
        let response = self.call(system, user, structured).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn provider_message(body: String) -> String {
    serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn invoke(&self, _: &str, _: &str, _: bool) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn test_client() -> LlmClient {
        LlmClient::new(GatewayConfig {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:9/unreachable".to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"skill\": \"Docker\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"skill\": \"Docker\"}");
    }

    #[test]
    fn test_strip_json_fences_bare_fence() {
        let input = "```\n{\"skill\": \"Docker\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"skill\": \"Docker\"}");
    }

    #[test]
    fn test_strip_json_fences_plain_json_untouched() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_structured_request_sets_json_mode_and_zero_temperature() {
        let client = test_client();
        let body = serde_json::to_value(client.build_request("sys", "usr", true)).unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_free_text_request_omits_response_format() {
        let client = test_client();
        let body = serde_json::to_value(client.build_request("sys", "usr", false)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_chat_response_text_reads_first_choice() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"ok\": true}"));
        assert_eq!(response.usage.unwrap().completion_tokens, 4);
    }

    #[test]
    fn test_chat_response_without_choices_has_no_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_provider_message_parses_error_body() {
        let body = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        assert_eq!(provider_message(body.to_string()), "Invalid API Key");
        assert_eq!(provider_message("gateway down".to_string()), "gateway down");
    }

    #[tokio::test]
    async fn test_empty_prompts_rejected_before_sending() {
        let client = test_client();
        let err = client.invoke("", "user", true).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidPrompt(_)));
        let err = client.invoke("system", "   ", true).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidPrompt(_)));
    }

    #[tokio::test]
    async fn test_call_json_decodes_fenced_output() {
        #[derive(Deserialize)]
        struct Reply {
            ok: bool,
        }
        let model = CannedModel("```json\n{\"ok\": true}\n```");
        let reply: Reply = call_json(&model, "sys", "usr").await.unwrap();
        assert!(reply.ok);
    }

    #[tokio::test]
    async fn test_call_json_reports_parse_error() {
        let model = CannedModel("Sure! Here is the JSON you asked for.");
        let err = call_json::<serde_json::Value>(&model, "sys", "usr")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_call_json_empty_reply_is_empty_content() {
        let model = CannedModel("   ");
        let err = call_json::<serde_json::Value>(&model, "sys", "usr")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
