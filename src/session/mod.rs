use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod storage;
pub mod store;

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_TITLE: &str = "New Chat";
pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(content: impl Into<String>, role: Role) -> Self {
        Self {
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends a message, deriving the title when it is the first user turn.
    pub fn push(&mut self, message: Message) {
        let first_user_turn =
            message.role == Role::User && !self.messages.iter().any(|m| m.role == Role::User);
        if first_user_turn {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

pub fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_keeps_short_text_unchanged() {
        assert_eq!(
            derive_title("What is quantum mechanics?"),
            "What is quantum mechanics?"
        );
    }

    #[test]
    fn derive_title_truncates_at_thirty_chars_with_ellipsis() {
        let text = "Explain the difference between speed and velocity please";
        let title = derive_title(text);
        assert_eq!(title, format!("{}...", &text[..30]));
    }

    #[test]
    fn derive_title_of_exactly_thirty_chars_has_no_ellipsis() {
        let text = "a".repeat(30);
        assert_eq!(derive_title(&text), text);
    }

    #[test]
    fn derive_title_counts_chars_not_bytes() {
        let text = "ψ".repeat(31);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 33);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn title_is_set_only_by_the_first_user_message() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.title, DEFAULT_TITLE);

        conversation.push(Message::new("Welcome back", Role::Assistant));
        assert_eq!(conversation.title, DEFAULT_TITLE);

        conversation.push(Message::new("What is momentum?", Role::User));
        conversation.push(Message::new("And what is energy?", Role::User));
        assert_eq!(conversation.title, "What is momentum?");
        assert_eq!(conversation.messages.len(), 3);
    }

    #[test]
    fn conversation_serializes_with_camel_case_created_at() {
        let conversation = Conversation::new();
        let value = serde_json::to_value(&conversation).expect("conversation should serialize");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("created_at").is_none());
        assert_eq!(value["title"], DEFAULT_TITLE);
    }

    #[test]
    fn message_role_serializes_lowercase() {
        let message = Message::new("hi", Role::Assistant);
        let value = serde_json::to_value(&message).expect("message should serialize");
        assert_eq!(value["role"], "assistant");
    }
}
