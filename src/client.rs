use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ChatError;

/// Anything that can answer a question. The widget only talks to this trait.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<Value>,
}

impl ErrorBody {
    /// Scalar messages are shown as text; blank strings and structured
    /// values count as missing.
    fn into_message(self) -> Option<String> {
        match self.message? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct AnswerClient {
    client: Client,
    endpoint: String,
}

impl AnswerClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerService for AnswerClient {
    async fn ask(&self, question: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { question })
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            // The body is optional on failures; anything unreadable falls back
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            return Err(ChatError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Request(format!("Invalid response body: {}", e)))?;
        Ok(chat_response.answer)
    }
}

fn classify_send_error(err: reqwest::Error) -> ChatError {
    debug!(error = %err, "chat request failed before a response arrived");
    if err.is_builder() {
        ChatError::Request(err.to_string())
    } else if err.is_connect() || err.is_timeout() || err.is_request() {
        ChatError::NoResponse
    } else {
        ChatError::Request(err.to_string())
    }
}
