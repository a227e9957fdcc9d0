use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ChatError;
use crate::session::Message;

/// OpenAI-compatible API root of Alibaba Cloud Bailian (DashScope).
/// Not user-configurable; tests point [`DashScopeClient::with_base_url`]
/// at a local mock instead.
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Fixed sampling temperature sent with every request.
const TEMPERATURE: f32 = 0.7;

/// Body of a chat-completions request. `messages` is the full conversation
/// so far, oldest first, including the user turn being answered.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: TEMPERATURE,
            stream: false,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Error payload DashScope attaches to non-success statuses. Anything that
/// fails to parse into this shape is treated as an absent message.
#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the DashScope chat-completions endpoint.
///
/// Holds the bearer credential; a client constructed without one fails
/// every [`complete`](Self::complete) call with [`ChatError::MissingApiKey`]
/// before any traffic is sent. No request timeout is set here — the
/// transport default applies.
#[derive(Clone)]
pub struct DashScopeClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl DashScopeClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DASHSCOPE_BASE_URL)
    }

    /// Same client against a different API root (local gateway, mock server).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    /// Send one completion request and return the first choice's content.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_PATH);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("DashScope returned {status}: {body}");
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ChatError::Api { status, message });
        }

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}
