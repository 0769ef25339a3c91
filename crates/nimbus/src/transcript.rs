//! Conversation transcript written when a chat ends

use std::fmt::Write as _;
use std::path::Path;

pub const DEFAULT_TRANSCRIPT: &str = "conversation.txt";

/// Answers accepted as "yes" at the save prompt
pub const YES_ANSWERS: &[&str] = &["y", "yes", "是"];

pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    YES_ANSWERS.contains(&answer.as_str())
}

#[derive(Debug, Default)]
pub struct Transcript {
    exchanges: Vec<(String, String)>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.exchanges.push((user.into(), assistant.into()));
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Numbered exchanges under a title
    pub fn render(&self) -> String {
        let mut out = String::from("Conversation transcript\n=======================\n\n");
        for (i, (user, assistant)) in self.exchanges.iter().enumerate() {
            let _ = write!(
                out,
                "--- Exchange {} ---\nYou: {}\n\nAssistant: {}\n\n",
                i + 1,
                user,
                assistant
            );
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.render()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_answers() {
        for answer in ["y", "Y", "yes", "YES ", "是"] {
            assert!(is_yes(answer), "{}", answer);
        }
        for answer in ["", "n", "no", "否", "yep"] {
            assert!(!is_yes(answer), "{}", answer);
        }
    }

    #[test]
    fn test_render_numbers_exchanges() {
        let mut transcript = Transcript::new();
        transcript.push("北京今天天气怎么样", "北京今天晴，-3°C。");
        transcript.push("明天呢", "明天多云。");

        let text = transcript.render();
        assert!(text.starts_with("Conversation transcript\n"));
        assert!(text.contains("--- Exchange 1 ---\nYou: 北京今天天气怎么样\n\nAssistant: 北京今天晴，-3°C。"));
        assert!(text.contains("--- Exchange 2 ---\nYou: 明天呢"));
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("chat.txt");

        let mut transcript = Transcript::new();
        transcript.push("hi", "hello");
        transcript.write_to(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("You: hi"));
    }
}
