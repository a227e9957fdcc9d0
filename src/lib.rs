//! TUI chat client for Alibaba Cloud Bailian (DashScope) Qwen models.
//!
//! The conversation itself lives in [`session::ChatSession`]: an append-only
//! message history guarded by a single in-flight flag, where every send
//! outcome, including failures, becomes an assistant turn. The
//! [`dashscope::DashScopeClient`] speaks the OpenAI-compatible
//! chat-completions protocol; the remaining modules are the terminal
//! front-end around that core.

pub mod app;
pub mod config;
pub mod dashscope;
pub mod error;
pub mod handler;
pub mod models;
pub mod session;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use config::Config;
pub use dashscope::{ChatRequest, DashScopeClient};
pub use error::ChatError;
pub use models::{ModelInfo, AVAILABLE_MODELS, DEFAULT_MODEL};
pub use session::{ChatSession, Message, Role, GREETING};
