use thiserror::Error;

/// Failures raised while exchanging a turn with the completion endpoint.
///
/// None of these escape [`crate::session::ChatSession`]: the send flow
/// converts every variant into a synthetic assistant message and releases
/// the loading flag, so a failed request is just another chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("未找到 API Key，请设置 DASHSCOPE_API_KEY 环境变量")]
    MissingApiKey,

    #[error("API Request Failed: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("empty response")]
    EmptyResponse,

    #[error("internal: {0}")]
    Internal(String),
}
