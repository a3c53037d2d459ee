//! Presentation seam between the chat session and a front end

use autoagent_core::conversation::Message;
use std::fmt;

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user outside the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What a front end must provide to host a [`crate::ChatSession`]
///
/// The message area always shows the current conversation. Calls arrive
/// from whichever task drives the session, never while a store lock is held.
pub trait ChatView: Send + Sync {
    /// Empty the message area
    fn clear_messages(&self);

    /// Append one message to the message area
    fn render_message(&self, message: &Message);

    /// Show the title of the current conversation
    fn set_title(&self, title: &str);

    /// Show the transient placeholder for a pending reply
    fn show_loading(&self, conversation_id: &str);

    /// Remove the placeholder shown by `show_loading`
    fn hide_loading(&self, conversation_id: &str);

    /// Indeterminate progress for an operation outside the transcript
    fn show_progress(&self, label: &str);

    fn hide_progress(&self);

    fn notify(&self, notice: Notice);

    /// Ask the user to confirm an irreversible action
    fn confirm(&self, prompt: &str) -> bool;
}
