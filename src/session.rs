//! The session store: sole owner of the persisted conversation log.
//!
//! All external access to the log goes through the four operations here.
//! Persistence is best-effort: every mutation triggers a save, but a failed
//! save is logged and swallowed; the in-memory log stays authoritative for
//! the running session.

use crate::logging;
use crate::models::{ChatMessage, Role};
use crate::storage::{HISTORY_RECORD, Storage};

/// Typed failures from session-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The persisted log exists but cannot be deserialized. Callers treat
    /// this as absence and fail open to a seeded log.
    #[error("persisted conversation log is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// `append_to_last` targeted a message that is not the assistant tail.
    /// Indicates a logic bug in the caller, not a user-facing condition.
    #[error("message {id} is not the growable tail of the log")]
    NotFound { id: String },
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Owns the ordered conversation log and the history record it persists to.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    messages: Vec<ChatMessage>,
}

impl SessionStore {
    /// Load the log from storage, failing open to a seeded welcome log when
    /// the record is absent or corrupt. Corruption is logged, never surfaced
    /// to the UI.
    pub fn open(storage: Box<dyn Storage>, display_name: Option<&str>) -> Self {
        let (messages, seeded) = match Self::load_record(storage.as_ref()) {
            Ok(Some(messages)) => (messages, false),
            Ok(None) => (vec![ChatMessage::welcome(display_name)], true),
            Err(e) => {
                logging::warn(format!("Discarding unreadable chat history: {e}"));
                (vec![ChatMessage::welcome(display_name)], true)
            }
        };
        let store = Self { storage, messages };
        if seeded {
            // Persist the seed right away so subsequent loads see the same
            // welcome message rather than re-seeding a fresh one.
            store.save();
        }
        store
    }

    /// Deserialize the raw history record. `Ok(None)` means no record exists;
    /// an empty persisted log (post-clear) round-trips as `Some(vec![])`.
    pub fn load_record(storage: &dyn Storage) -> Result<Option<Vec<ChatMessage>>, StoreError> {
        let Some(bytes) = storage.read(HISTORY_RECORD)? else {
            return Ok(None);
        };
        let messages: Vec<ChatMessage> = serde_json::from_slice(&bytes)?;
        Ok(Some(messages))
    }

    /// The live log, in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Insert a message at the tail and persist.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.save();
    }

    /// Append `delta` to the text of the in-flight assistant message.
    ///
    /// The target must be the last element of the log and of assistant role;
    /// anything else means the caller's streaming state went stale.
    pub fn append_to_last(&mut self, id: &str, delta: &str) -> Result<(), StoreError> {
        let Some(last) = self.messages.last_mut() else {
            return Err(StoreError::NotFound { id: id.to_string() });
        };
        if last.id != id || last.role != Role::Assistant {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        last.text.push_str(delta);
        self.save();
        Ok(())
    }

    /// Empty the log and remove the persisted record. Does not re-seed the
    /// welcome message; that happens on the next `open`.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.storage.remove(HISTORY_RECORD) {
            logging::warn(format!("Failed to remove persisted chat history: {e}"));
        }
    }

    fn save(&self) {
        let bytes = match serde_json::to_vec(&self.messages) {
            Ok(bytes) => bytes,
            Err(e) => {
                logging::warn(format!("Failed to serialize chat history: {e}"));
                return;
            }
        };
        if let Err(e) = self.storage.write(HISTORY_RECORD, &bytes) {
            logging::warn(format!("Failed to persist chat history: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn open_store(storage: &MemoryStorage, name: Option<&str>) -> SessionStore {
        SessionStore::open(Box::new(storage.clone()), name)
    }

    #[test]
    fn fresh_store_seeds_welcome_with_display_name() {
        let storage = MemoryStorage::new();
        let store = open_store(&storage, Some("Lan"));
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].role, Role::Assistant);
        assert!(store.messages()[0].text.contains("Lan"));
    }

    #[test]
    fn seeded_log_round_trips_like_any_other() {
        let storage = MemoryStorage::new();
        let first = open_store(&storage, Some("Lan"));
        let seeded = first.messages().to_vec();

        // The seed is persisted immediately; a second load yields the exact
        // same log, timestamps included.
        let second = open_store(&storage, Some("Lan"));
        assert_eq!(second.messages(), seeded.as_slice());
    }

    #[test]
    fn append_persists_and_reloads_identically() {
        let storage = MemoryStorage::new();
        let mut store = open_store(&storage, None);
        store.append(ChatMessage::user("2+2?"));
        store.append(ChatMessage::assistant("4"));
        let before = store.messages().to_vec();

        let reloaded = open_store(&storage, None);
        assert_eq!(reloaded.messages(), before.as_slice());
    }

    #[test]
    fn append_to_last_grows_the_assistant_tail() {
        let storage = MemoryStorage::new();
        let mut store = open_store(&storage, None);
        let msg = ChatMessage::assistant("4");
        let id = msg.id.clone();
        store.append(msg);

        store.append_to_last(&id, " is the").unwrap();
        store.append_to_last(&id, " answer.").unwrap();
        assert_eq!(store.messages().last().unwrap().text, "4 is the answer.");
    }

    #[test]
    fn append_to_last_rejects_non_tail_ids() {
        let storage = MemoryStorage::new();
        let mut store = open_store(&storage, None);
        let first = ChatMessage::assistant("a");
        let first_id = first.id.clone();
        store.append(first);
        store.append(ChatMessage::assistant("b"));

        let err = store.append_to_last(&first_id, "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn append_to_last_rejects_user_tail() {
        let storage = MemoryStorage::new();
        let mut store = open_store(&storage, None);
        let msg = ChatMessage::user("hello");
        let id = msg.id.clone();
        store.append(msg);

        assert!(store.append_to_last(&id, "x").is_err());
    }

    #[test]
    fn corrupt_record_fails_open_to_seeded_log() {
        let storage = MemoryStorage::new();
        storage.write(HISTORY_RECORD, b"{not json!").unwrap();

        let err = SessionStore::load_record(&storage).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));

        let store = open_store(&storage, Some("Lan"));
        assert_eq!(store.messages().len(), 1);
        assert!(store.messages()[0].text.contains("Lan"));
    }

    #[test]
    fn clear_removes_record_without_reseeding() {
        let storage = MemoryStorage::new();
        let mut store = open_store(&storage, None);
        store.append(ChatMessage::user("hi"));
        store.clear();

        assert!(store.messages().is_empty());
        assert!(storage.read(HISTORY_RECORD).unwrap().is_none());
        // Next open seeds a fresh welcome log, distinct from the cleared one.
        let reopened = open_store(&storage, None);
        assert_eq!(reopened.messages().len(), 1);
    }
}
