use crate::session::storage::Storage;
use crate::session::{Conversation, Message, Role, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::io;

pub const CONVERSATIONS_KEY: &str = "conversations";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid conversation data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown schema version: {0}")]
    UnknownSchema(u32),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRef<'a> {
    schema_version: u32,
    conversations: &'a [Conversation],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedState {
    Versioned {
        #[serde(rename = "schemaVersion")]
        schema_version: u32,
        conversations: Vec<Conversation>,
    },
    // Written before the envelope existed: a bare array.
    Legacy(Vec<Conversation>),
}

fn decode(raw: &str) -> Result<Vec<Conversation>, StoreError> {
    match serde_json::from_str::<PersistedState>(raw)? {
        PersistedState::Versioned {
            schema_version,
            conversations,
        } => {
            if schema_version != SCHEMA_VERSION {
                return Err(StoreError::UnknownSchema(schema_version));
            }
            Ok(conversations)
        }
        PersistedState::Legacy(conversations) => Ok(conversations),
    }
}

fn encode(conversations: &[Conversation]) -> Result<String, StoreError> {
    let state = PersistedRef {
        schema_version: SCHEMA_VERSION,
        conversations,
    };
    Ok(serde_json::to_string(&state)?)
}

fn read_raw(storage: &dyn Storage) -> Option<String> {
    match storage.read(CONVERSATIONS_KEY) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!("failed to read persisted conversations: {err}");
            None
        }
    }
}

/// Reads the persisted conversation list. Never fails: absent, unreadable or
/// malformed state yields an empty list.
pub fn load(storage: &dyn Storage) -> Vec<Conversation> {
    let Some(raw) = read_raw(storage) else {
        return Vec::new();
    };
    match decode(&raw) {
        Ok(conversations) => conversations,
        Err(err) => {
            tracing::warn!("discarding persisted conversations: {err}");
            Vec::new()
        }
    }
}

/// Key holding a record whose schema version this build cannot read.
pub fn backup_key(version: u32) -> String {
    format!("{CONVERSATIONS_KEY}.v{version}.bak")
}

pub fn save(storage: &mut dyn Storage, conversations: &[Conversation]) -> Result<(), StoreError> {
    let raw = encode(conversations)?;
    storage.write(CONVERSATIONS_KEY, &raw)?;
    Ok(())
}

/// Returns `false` when a record of an unknown schema version exists and
/// could not be copied aside.
fn preserve_unknown_schema(storage: &mut dyn Storage) -> bool {
    let Some(raw) = read_raw(storage) else {
        return true;
    };
    let Err(StoreError::UnknownSchema(version)) = decode(&raw) else {
        return true;
    };

    let key = backup_key(version);
    match storage.write(&key, &raw) {
        Ok(()) => {
            tracing::warn!(
                version,
                backup = %key,
                "unknown schema version, previous data backed up"
            );
            true
        }
        Err(err) => {
            tracing::warn!(
                version,
                "unknown schema version and backup failed: {err}; changes will not be saved"
            );
            false
        }
    }
}

/// What the caller should activate after a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    /// `next_active` is the most recent remaining conversation, or `None`
    /// when the store is now empty.
    Deleted { next_active: Option<String> },
}

pub struct SessionStore {
    storage: Box<dyn Storage>,
    conversations: Vec<Conversation>,
    // Cleared when a record from a newer build could not be backed up.
    writable: bool,
}

impl SessionStore {
    /// Loads the stored conversations. A record with an unknown schema
    /// version is copied to [`backup_key`] before anything can overwrite it;
    /// if that copy fails the store keeps working in memory only.
    pub fn open(mut storage: Box<dyn Storage>) -> Self {
        let writable = preserve_unknown_schema(storage.as_mut());
        let conversations = load(storage.as_ref());
        tracing::debug!(count = conversations.len(), "loaded conversations");
        Self {
            storage,
            conversations,
            writable,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn most_recent(&self) -> Option<&Conversation> {
        self.conversations.first()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn create(&mut self) -> String {
        let mut conversation = Conversation::new();
        while self.find_by_id(&conversation.id).is_some() {
            conversation.id = uuid::Uuid::new_v4().to_string();
        }
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.persist();
        id
    }

    /// Returns `false` without touching storage when `id` is unknown.
    pub fn append(&mut self, id: &str, content: impl Into<String>, role: Role) -> bool {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        conversation.push(Message::new(content, role));
        self.persist();
        true
    }

    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return DeleteOutcome::NotFound;
        };
        self.conversations.remove(index);
        self.persist();
        DeleteOutcome::Deleted {
            next_active: self.most_recent().map(|c| c.id.clone()),
        }
    }

    fn persist(&mut self) {
        if !self.writable {
            return;
        }
        if let Err(err) = save(self.storage.as_mut(), &self.conversations) {
            tracing::warn!("failed to persist conversations: {err}");
        }
    }
}
