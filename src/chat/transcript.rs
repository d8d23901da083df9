use crate::chat::markup::{self, Block};
use crate::session::{Message, Role};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message {
        role: Role,
        blocks: Vec<Block>,
        timestamp: DateTime<Utc>,
    },
    /// Shown in place of a reply that failed; never persisted.
    Error { text: String },
    Welcome { prompts: &'static [&'static str] },
}

/// What the chat pane currently shows for the active conversation.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    typing: bool,
}

impl Transcript {
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.typing = false;
    }

    pub fn show_welcome(&mut self, prompts: &'static [&'static str]) {
        self.entries.clear();
        self.entries.push(TranscriptEntry::Welcome { prompts });
    }

    pub fn push_message(&mut self, message: &Message) {
        self.entries
            .retain(|entry| !matches!(entry, TranscriptEntry::Welcome { .. }));
        self.entries.push(TranscriptEntry::Message {
            role: message.role,
            blocks: markup::render(&message.content),
            timestamp: message.timestamp,
        });
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.entries.push(TranscriptEntry::Error { text: text.into() });
    }

    #[cfg(test)]
    pub fn message_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, TranscriptEntry::Message { .. }))
            .count()
    }

    #[cfg(test)]
    pub fn shows_welcome(&self) -> bool {
        matches!(self.entries.as_slice(), [TranscriptEntry::Welcome { .. }])
    }
}
