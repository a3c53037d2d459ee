//! Utility functions and helpers

use std::path::PathBuf;

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Create a safe filename from a string
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// Keep the first `max_chars` characters of `s`, appending `...` when
/// anything was cut. Counts characters, not bytes.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("llm_agent_chats"), "llm_agent_chats");
        assert_eq!(safe_filename("test/file:name"), "test_file_name");
        assert_eq!(safe_filename("hello world"), "hello_world");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 20), "hello");
        assert_eq!(truncate_chars(&"a".repeat(20), 20), "a".repeat(20));
        assert_eq!(
            truncate_chars(&"a".repeat(25), 20),
            format!("{}...", "a".repeat(20))
        );
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let title = truncate_chars("数据库连接失败怎么办？请帮我检查一下配置文件是否正确", 20);
        assert_eq!(title.chars().count(), 23);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_tilde("logs"), PathBuf::from("logs"));
    }
}
