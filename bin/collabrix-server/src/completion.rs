//! Client for an OpenAI-compatible chat-completion API.
//!
//! One prompt in, one text out. Calls are never retried; a transport-level
//! timeout bounds how long a handler can wait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion client setup failed: {0}")]
    Setup(String),

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),

    #[error("completion response had no choices")]
    EmptyChoices,
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Production [`CompletionClient`] speaking the `/chat/completions` protocol.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    chat_url: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| CompletionError::Setup(format!("invalid api key: {e}")))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            chat_url: format!("{}/{CHAT_COMPLETIONS_PATH}", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let started = std::time::Instant::now();
        let response = self.client.post(&self.chat_url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(
            model = %self.model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion call finished"
        );

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?;
        choice
            .message
            .content
            .ok_or_else(|| CompletionError::Malformed("first choice has no content".to_owned()))
    }
}

/// Test double that answers every prompt with a fixed outcome and keeps
/// the prompts it saw.
#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ScriptedCompletion {
        reply: Option<String>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub(crate) fn reply(text: &str) -> Self {
            Self {
                reply: Some(text.to_owned()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            self.reply.clone().ok_or(CompletionError::Status {
                status: 503,
                body: "unavailable".to_owned(),
            })
        }
    }
}
