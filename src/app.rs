use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::ChatError;
use crate::models::AVAILABLE_MODELS;
use crate::session::ChatSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,

    // Message input state
    pub input: String,
    pub cursor: usize, // cursor position in input, counted in characters

    // Chat viewport state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // In-flight completion, harvested by poll_completion
    pub task: Option<JoinHandle<Result<String, ChatError>>>,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            session,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_model_picker: false,
            model_picker_state: ListState::default(),

            task: None,
        }
    }

    /// Harvest the in-flight completion once its task has finished. Every
    /// outcome, including a panicked task, lands in the session history.
    pub async fn poll_completion(&mut self) {
        if !self.task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }

        if let Some(task) = self.task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(ChatError::Internal(format!("completion task failed: {err}"))),
            };
            self.session.finish_send(outcome);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_chat_down(&mut self) {
        let max_scroll = self.total_chat_lines().saturating_sub(self.chat_height);
        if self.chat_scroll < max_scroll {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat to bottom so the latest turn and "Thinking..." are visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            // Calculate wrapped lines for each line of content
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        // Lines for the "Thinking..." indicator
        total_lines += 2;

        total_lines
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = AVAILABLE_MODELS.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = AVAILABLE_MODELS.get(i) {
                self.session.set_model(model.id);
                self.show_model_picker = false;
                // Persist the choice for the next launch
                let _ = Config::save_default_model(model.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashscope::DashScopeClient;
    use crate::session::ChatSession;

    fn test_app() -> App {
        App::new(ChatSession::new(DashScopeClient::new(None), "qwen-plus"))
    }

    #[tokio::test]
    async fn poll_completion_harvests_finished_task() {
        let mut app = test_app();
        app.session.begin_send("hi").expect("accepted");
        app.task = Some(tokio::spawn(async { Ok("done".to_string()) }));

        while app.task.is_some() {
            app.poll_completion().await;
            tokio::task::yield_now().await;
        }

        assert!(!app.session.is_loading());
        assert_eq!(app.session.messages().last().unwrap().content, "done");
    }

    #[tokio::test]
    async fn poll_completion_reports_panicked_task() {
        let mut app = test_app();
        app.session.begin_send("hi").expect("accepted");
        app.task = Some(tokio::spawn(async { panic!("boom") }));

        while app.task.is_some() {
            app.poll_completion().await;
            tokio::task::yield_now().await;
        }

        assert!(!app.session.is_loading());
        let last = app.session.messages().last().unwrap();
        assert!(last.content.starts_with("出错了: internal: "));
    }
}
