use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use ratatui::layout::Rect;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::AnswerService;
use crate::config::Settings;
use crate::error::ChatError;
use crate::theme::ThemeMode;

/// Longest accepted question, counted in characters after trimming.
pub const MAX_QUESTION_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// What `App::submit` did with the current draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Question appended and request started.
    Sent,
    /// Draft was blank; nothing happened.
    Empty,
    /// Draft exceeded `MAX_QUESTION_CHARS`; error banner set.
    TooLong,
    /// A request is already outstanding; nothing happened.
    Busy,
}

struct PendingRequest {
    task: JoinHandle<Result<String, ChatError>>,
    cancel: CancellationToken,
}

pub struct App {
    pub should_quit: bool,
    pub theme: ThemeMode,

    // Conversation
    pub chat_messages: Vec<ChatMessage>,
    pub error: Option<String>,

    // Draft input
    pub draft: String,
    pub cursor: usize, // character index into draft

    // Transcript scrolling; the renderer fills in the geometry
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub max_chat_scroll: u16,
    pub chat_height: u16,

    // Animation state
    pub animation_frame: u8,

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub theme_button_area: Option<Rect>,
    pub send_button_area: Option<Rect>,

    service: Arc<dyn AnswerService>,
    request_timeout: Duration,
    pending: Option<PendingRequest>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(service: Arc<dyn AnswerService>, settings: &Settings) -> Self {
        Self {
            should_quit: false,
            theme: settings.theme,

            chat_messages: Vec::new(),
            error: None,

            draft: String::new(),
            cursor: 0,

            chat_scroll: 0,
            follow_bottom: true,
            max_chat_scroll: 0,
            chat_height: 0,

            animation_frame: 0,

            chat_area: None,
            theme_button_area: None,
            send_button_area: None,

            service,
            request_timeout: settings.request_timeout,
            pending: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Submit the current draft as a question.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.is_busy() {
            debug!("submit ignored, a request is already outstanding");
            return SubmitOutcome::Busy;
        }

        let len = self.draft.trim().chars().count();
        if len == 0 {
            return SubmitOutcome::Empty;
        }
        if len > MAX_QUESTION_CHARS {
            self.error = Some(
                ChatError::InputTooLong {
                    len,
                    max: MAX_QUESTION_CHARS,
                }
                .to_string(),
            );
            return SubmitOutcome::TooLong;
        }

        // The question goes out exactly as typed; only the checks use the trimmed form
        let question = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.push_message(ChatMessage::user(question.clone()));
        info!(chars = len, "submitting question");

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let service = Arc::clone(&self.service);
        let deadline = self.request_timeout;

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => Err(ChatError::Cancelled),
                result = tokio::time::timeout(deadline, service.ask(&question)) => {
                    result.unwrap_or(Err(ChatError::TimedOut(deadline)))
                }
            }
        });

        self.pending = Some(PendingRequest { task, cancel });
        SubmitOutcome::Sent
    }

    /// Apply the outcome of the outstanding request if it has finished.
    /// Returns true when the transcript or error banner changed.
    pub fn poll_pending(&mut self) -> bool {
        let finished = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.task.is_finished());
        if !finished {
            return false;
        }

        let Some(mut pending) = self.pending.take() else {
            return false;
        };
        match (&mut pending.task).now_or_never() {
            Some(joined) => {
                self.finish(flatten(joined));
                true
            }
            None => {
                self.pending = Some(pending);
                false
            }
        }
    }

    /// Wait for the outstanding request, however long it takes to settle.
    #[cfg(test)]
    pub async fn wait_for_answer(&mut self) {
        if let Some(pending) = self.pending.take() {
            let joined = pending.task.await;
            self.finish(flatten(joined));
        }
    }

    /// Abort the outstanding request. Its outcome is reported as cancelled.
    pub fn cancel(&mut self) {
        if let Some(pending) = &self.pending {
            info!("cancelling outstanding request");
            pending.cancel.cancel();
        }
    }

    fn finish(&mut self, result: Result<String, ChatError>) {
        match result {
            Ok(answer) => {
                info!(chars = answer.chars().count(), "answer received");
                self.push_message(ChatMessage::assistant(answer));
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, "question failed");
                self.error = Some(err.to_string());
            }
        }
        self.draft.clear();
        self.cursor = 0;
        self.animation_frame = 0;
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.chat_messages.push(message);
        self.scroll_to_bottom();
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        debug!(theme = self.theme.as_str(), "theme toggled");
    }

    // Draft editing. The input is disabled while a request is outstanding.
    pub fn insert_char(&mut self, c: char) {
        if self.is_busy() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn delete_before_cursor(&mut self) {
        if self.is_busy() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.remove(byte_pos);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.is_busy() {
            return;
        }
        if self.cursor < self.draft_len() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft_len());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft_len();
    }

    pub fn draft_len(&self) -> usize {
        self.draft.chars().count()
    }

    // Transcript scrolling
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_chat_scroll;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
        if self.chat_scroll >= self.max_chat_scroll {
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(pending) = &self.pending {
            pending.cancel.cancel();
        }
    }
}

fn flatten(joined: Result<Result<String, ChatError>, JoinError>) -> Result<String, ChatError> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(ChatError::Request(err.to_string())),
    }
}
