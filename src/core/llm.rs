//! Chat-completion abstraction for structured ("tool call") output.
//!
//! A [`CompletionClient`] sends system/user messages together with one tool
//! declaration and returns the raw JSON arguments the model produced for that
//! tool. [`RetryingClient`] layers the backoff policy on top of any client.

use crate::providers::util::{RetryPolicy, with_retry};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("LLM service unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: usize, last: Box<LlmError> },
}

impl LlmError {
    /// Transport failures, rate limiting, timeouts and server errors can
    /// succeed on a later attempt. Malformed or unauthorized requests cannot.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RequestFailed(_) | LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::ParseError(_) | LlmError::NotConfigured(_) | LlmError::Unavailable { .. } => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A function the model is asked to "call"; `parameters` is a JSON schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tool: ToolSpec,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync + fmt::Debug {
    /// Returns the tool-call arguments string of the first tool call.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

/// Retries retryable failures of the inner client with exponential backoff.
/// Exhausting the attempts yields [`LlmError::Unavailable`]; non-retryable
/// errors are returned after the first attempt unchanged.
#[derive(Debug)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: CompletionClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for RetryingClient<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut attempts = 0;
        let result = with_retry(
            &self.policy,
            || {
                attempts += 1;
                self.inner.complete(request)
            },
            LlmError::is_retryable,
        )
        .await;

        match result {
            Err(e) if e.is_retryable() => {
                warn!("[LLM] giving up after {attempts} attempts: {e}");
                Err(LlmError::Unavailable {
                    attempts,
                    last: Box::new(e),
                })
            }
            other => other,
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::ParseError("script exhausted".to_string())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            tool: ToolSpec {
                name: "generate_itinerary".to_string(),
                description: "test".to_string(),
                parameters: json!({"type": "object"}),
            },
            temperature: 0.7,
            max_tokens: None,
        }
    }

    fn server_error() -> LlmError {
        LlmError::ApiError {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn test_retryable_classification() {
        assert!(server_error().is_retryable());
        assert!(LlmError::RequestFailed("timeout".to_string()).is_retryable());
        assert!(
            LlmError::RateLimited {
                retry_after_secs: Some(1)
            }
            .is_retryable()
        );
        for status in [400, 401, 403, 404, 422] {
            let err = LlmError::ApiError {
                status,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "{status} should not be retried");
        }
        assert!(!LlmError::ParseError("bad".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![
                Err(server_error()),
                Err(server_error()),
                Ok("{\"intro\":\"ok\"}".to_string()),
            ]),
            fast_policy(),
        );

        let args = client.complete(&request()).await.unwrap();

        assert_eq!(args, "{\"intro\":\"ok\"}");
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![Err(LlmError::ApiError {
                status: 400,
                message: "invalid tool schema".to_string(),
            })]),
            fast_policy(),
        );

        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, LlmError::ApiError { status: 400, .. }));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_unavailable() {
        let client = RetryingClient::new(
            ScriptedClient::new(vec![
                Err(server_error()),
                Err(server_error()),
                Err(server_error()),
            ]),
            fast_policy(),
        );

        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, LlmError::Unavailable { attempts: 3, .. }));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }
}
