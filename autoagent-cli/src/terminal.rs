//! Terminal rendering for a chat session

use autoagent_client::{ChatView, Notice, NoticeLevel};
use autoagent_core::conversation::{Message, Role};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// [`ChatView`] that prints the transcript to stdout
///
/// Starts muted so opening a session for a one-shot command does not dump
/// the whole current conversation.
pub struct TerminalView {
    muted: AtomicBool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            muted: AtomicBool::new(true),
            spinner: Mutex::new(None),
        }
    }

    /// Start printing transcript updates
    pub fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn start_spinner(&self, label: &str) {
        let bar = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(spinner_style);
        }
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = self.spinner.lock().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.spinner.lock().take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for TerminalView {
    fn clear_messages(&self) {
        if !self.is_muted() {
            println!();
        }
    }

    fn render_message(&self, message: &Message) {
        if self.is_muted() {
            return;
        }
        print_message(message);
    }

    fn set_title(&self, title: &str) {
        if !self.is_muted() {
            println!("{}", style(title).bold().underlined());
        }
    }

    fn show_loading(&self, _conversation_id: &str) {
        self.start_spinner("Thinking...");
    }

    fn hide_loading(&self, _conversation_id: &str) {
        self.stop_spinner();
    }

    fn show_progress(&self, label: &str) {
        self.start_spinner(label);
    }

    fn hide_progress(&self) {
        self.stop_spinner();
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => println!("{} {}", style("i").cyan(), notice.text),
            NoticeLevel::Success => println!("{} {}", style("✓").green(), notice.text),
            NoticeLevel::Warning => eprintln!("{} {}", style("!").yellow(), notice.text),
            NoticeLevel::Error => eprintln!("{} {}", style("✗").red(), notice.text),
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.stop_spinner();
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Print one message with a role header
pub fn print_message(message: &Message) {
    let time = message
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M");
    let header = match message.role {
        Role::User => style("You").green().bold(),
        Role::Assistant => style("Agent").cyan().bold(),
        Role::System => style("System").yellow().bold(),
    };
    println!("{} {}", header, style(time).dim());
    println!("{}", message.content);

    for (label, text) in annotation_lines(message) {
        println!("  {} {}", style(label).dim(), style(text).dim());
    }
    println!();
}

/// Labelled reasoning steps then tools used, in display order
fn annotation_lines(message: &Message) -> Vec<(&'static str, String)> {
    let Some(annotations) = &message.annotations else {
        return Vec::new();
    };
    let steps = annotations
        .reasoning_steps
        .iter()
        .map(|step| ("reasoning", value_text(step)));
    let tools = annotations
        .tools_used
        .iter()
        .map(|tool| ("tool", value_text(tool)));
    steps.chain(tools).collect()
}

fn value_text(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoagent_core::conversation::Annotations;
    use serde_json::json;

    #[test]
    fn test_annotation_lines_label_steps_and_tools() {
        let message = Message::new(Role::Assistant, "done").with_annotations(Annotations {
            reasoning_steps: vec![json!("look"), json!({"step": 2})],
            tools_used: vec![json!({"name": "shell"})],
        });

        assert_eq!(
            annotation_lines(&message),
            vec![
                ("reasoning", "look".to_string()),
                ("reasoning", r#"{"step":2}"#.to_string()),
                ("tool", r#"{"name":"shell"}"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_plain_message_has_no_annotation_lines() {
        assert!(annotation_lines(&Message::new(Role::User, "hi")).is_empty());
    }
}
