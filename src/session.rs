use serde::{Deserialize, Serialize};
use tracing::error;

use crate::dashscope::{ChatRequest, DashScopeClient};
use crate::error::ChatError;

/// Opening assistant turn seeded into every new session.
pub const GREETING: &str = "你好！我是阿里百炼智能助手 (Qwen)，有什么可以帮你的吗？";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn. Serializes to the `{role, content}` wire shape,
/// so the history can be sent as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation state for a single chat session: the ordered message
/// history, the in-flight flag gating sends, and the model used for the
/// next turn.
///
/// Every outcome of a send lands in the history — replies as ordinary
/// assistant turns, failures as an assistant turn prefixed with "出错了: ".
/// Nothing here returns an error to the caller, and the in-flight flag is
/// released whatever happens, so the session can always take another send.
pub struct ChatSession {
    client: DashScopeClient,
    messages: Vec<Message>,
    loading: bool,
    current_model: String,
}

impl ChatSession {
    pub fn new(client: DashScopeClient, model: impl Into<String>) -> Self {
        Self {
            client,
            messages: vec![Message::assistant(GREETING)],
            loading: false,
            current_model: model.into(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn current_model(&self) -> &str {
        &self.current_model
    }

    pub fn client(&self) -> &DashScopeClient {
        &self.client
    }

    /// Switch the model for subsequent sends. Takes effect on the next
    /// request; the history is untouched.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.current_model = model.into();
    }

    /// First half of a send: record the user turn, raise the in-flight
    /// flag, and build the request carrying the full history. Blank input
    /// (after trimming) and overlapping sends return `None` with no state
    /// change. The accepted input is recorded verbatim, untrimmed.
    pub fn begin_send(&mut self, content: &str) -> Option<ChatRequest> {
        if content.trim().is_empty() || self.loading {
            return None;
        }

        self.messages.push(Message::user(content));
        self.loading = true;

        Some(ChatRequest::new(
            self.current_model.clone(),
            self.messages.clone(),
        ))
    }

    /// Second half of a send: record the outcome and release the in-flight
    /// flag. Failures are absorbed as an error turn, never propagated.
    pub fn finish_send(&mut self, outcome: Result<String, ChatError>) {
        match outcome {
            Ok(reply) => self.messages.push(Message::assistant(reply)),
            Err(err) => {
                error!("chat completion failed: {err}");
                self.messages.push(Message::assistant(format!("出错了: {err}")));
            }
        }
        self.loading = false;
    }

    /// Send one user message and wait for the reply.
    pub async fn send_message(&mut self, content: &str) {
        let Some(request) = self.begin_send(content) else {
            return;
        };
        let outcome = self.client.complete(&request).await;
        self.finish_send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn success_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn session_against(server: &MockServer) -> ChatSession {
        let client = DashScopeClient::with_base_url(Some("test-key".into()), server.uri());
        ChatSession::new(client, "qwen-plus")
    }

    #[test]
    fn new_session_starts_with_greeting() {
        let session = ChatSession::new(DashScopeClient::new(None), "qwen-plus");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0], Message::assistant(GREETING));
        assert!(!session.is_loading());
        assert_eq!(session.current_model(), "qwen-plus");
    }

    #[test]
    fn begin_send_keeps_input_verbatim() {
        let mut session = ChatSession::new(DashScopeClient::new(Some("k".into())), "qwen-plus");
        let request = session.begin_send("  hi there  ").expect("accepted");
        assert_eq!(session.messages()[1], Message::user("  hi there  "));
        assert_eq!(request.messages.len(), 2);
        assert!(session.is_loading());
    }

    #[test]
    fn overlapping_send_is_dropped() {
        let mut session = ChatSession::new(DashScopeClient::new(Some("k".into())), "qwen-plus");
        assert!(session.begin_send("first").is_some());
        assert!(session.is_loading());

        assert!(session.begin_send("second").is_none());
        assert_eq!(session.messages().len(), 2);
        assert!(session.is_loading());
    }

    #[tokio::test]
    async fn blank_input_is_dropped_without_traffic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("unreachable")))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = session_against(&server);
        session.send_message("   \n\t").await;

        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn send_message_appends_user_then_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hi there")))
            .mount(&server)
            .await;

        let mut session = session_against(&server);
        session.send_message("Hello").await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::assistant(GREETING));
        assert_eq!(messages[1], Message::user("Hello"));
        assert_eq!(messages[2], Message::assistant("Hi there"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn request_carries_full_history_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("first reply")))
            .mount(&server)
            .await;

        let mut session = session_against(&server);
        session.send_message("first question").await;
        session.send_message("second question").await;

        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 2);
        let body: serde_json::Value =
            serde_json::from_slice(&requests[1].body).expect("json body");
        assert_eq!(body["model"], serde_json::json!("qwen-plus"));
        assert_eq!(body["stream"], serde_json::json!(false));
        assert_eq!(
            body["messages"],
            serde_json::json!([
                {"role": "assistant", "content": GREETING},
                {"role": "user", "content": "first question"},
                {"role": "assistant", "content": "first reply"},
                {"role": "user", "content": "second question"},
            ])
        );
    }

    #[tokio::test]
    async fn set_model_applies_to_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "qwen-max"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_against(&server);
        session.set_model("qwen-max");
        session.send_message("Hello").await;

        assert_eq!(session.current_model(), "qwen-max");
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn api_error_becomes_error_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"message": "overloaded"})),
            )
            .mount(&server)
            .await;

        let mut session = session_against(&server);
        session.send_message("Hello").await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("Hello"));
        assert_eq!(
            messages[2],
            Message::assistant("出错了: API Request Failed: 500 - overloaded")
        );
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn missing_key_yields_error_turn_without_traffic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("unreachable")))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = ChatSession::new(
            DashScopeClient::with_base_url(None, server.uri()),
            "qwen-plus",
        );
        session.send_message("Hello").await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("Hello"));
        assert!(messages[2].content.starts_with("出错了: "));
        assert!(messages[2].content.contains("未找到 API Key"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn transport_failure_releases_flag() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let mut session = ChatSession::new(
            DashScopeClient::with_base_url(Some("test-key".into()), uri),
            "qwen-plus",
        );
        session.send_message("Hello").await;

        assert!(!session.is_loading());
        let last = session.messages().last().expect("error turn");
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with("出错了: "));
    }
}
