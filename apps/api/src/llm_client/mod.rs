//! Claude Messages client — the single point of entry for all LLM calls.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! Every prompt in this service demands JSON-only output, so the only
//! calling surface is `call_json`; there is no raw-text API.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// Hardcoded on purpose — a configurable model drifts away from the prompt
/// contract the analysis schema was written against.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM reply carried no text content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// The JSON payload of the reply: the first text block, with any
    /// markdown code fences the model wrapped around it stripped off.
    fn json_payload(&self) -> Result<&str, LlmError> {
        let text = self
            .content
            .iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text.as_deref())
            .ok_or(LlmError::EmptyContent)?;
        Ok(strip_code_fences(text))
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Sends a prompt and deserializes the JSON reply into `T`.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self.send_with_retry(&request).await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            response.usage.input_tokens, response.usage.output_tokens
        );

        serde_json::from_str(response.json_payload()?).map_err(LlmError::Parse)
    }

    /// Retries transport failures, 429s and 5xx with exponential backoff.
    /// Client-side API errors (4xx) are final on the first attempt.
    async fn send_with_retry(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) => {
                    warn!("LLM API call failed: {e}");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: MAX_RETRIES,
        }))
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, LlmError> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Rate limits, server errors and transport failures are worth retrying;
/// everything else (bad request, parse failure) will not get better.
fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Exponential backoff: 1s, 2s, 4s. `attempt` counts from 1.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000u64 << (attempt - 1))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    let body = body.trim_start();
    body.strip_suffix("```").map(str::trim).unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(text: &str) -> ContentBlock {
        ContentBlock {
            kind: "text".to_string(),
            text: Some(text.to_string()),
        }
    }

    fn response(blocks: Vec<ContentBlock>) -> MessagesResponse {
        MessagesResponse {
            content: blocks,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }
    }

    #[test]
    fn test_strip_code_fences_json_tagged() {
        assert_eq!(
            strip_code_fences("```json\n{\"score\": 7}\n```"),
            "{\"score\": 7}"
        );
    }

    #[test]
    fn test_strip_code_fences_untagged() {
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_strip_code_fences_bare_json_untouched() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_unclosed_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_json_payload_takes_first_text_block() {
        let resp = response(vec![text_block("{\"a\": 1}"), text_block("{\"b\": 2}")]);
        assert_eq!(resp.json_payload().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_json_payload_skips_non_text_blocks() {
        let resp = response(vec![
            ContentBlock {
                kind: "thinking".to_string(),
                text: None,
            },
            text_block("```json\n{\"a\": 1}\n```"),
        ]);
        assert_eq!(resp.json_payload().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_json_payload_empty_reply_is_error() {
        let resp = response(vec![]);
        assert!(matches!(resp.json_payload(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_rate_limit_and_server_errors_retryable() {
        for status in [429, 500, 503] {
            let e = LlmError::Api {
                status,
                message: String::new(),
            };
            assert!(is_retryable(&e), "status {status} not retried");
        }
    }

    #[test]
    fn test_client_errors_not_retryable() {
        for status in [400, 401, 404] {
            let e = LlmError::Api {
                status,
                message: String::new(),
            };
            assert!(!is_retryable(&e), "status {status} retried");
        }
        assert!(!is_retryable(&LlmError::EmptyContent));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
    }
}
