//! In-memory conversation store.

use parley_application::ports::conversation_store::{
    ConversationRecord, ConversationStore, StoreError,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Conversation store backed by a process-local map.
///
/// The default adapter for embedding hosts that keep dialogue state for the
/// lifetime of the process; durable hosts supply their own
/// [`ConversationStore`] implementation.
#[derive(Default)]
pub struct InMemoryConversationStore {
    records: Mutex<BTreeMap<String, ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with stored state.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load(&self, conversation_id: &str) -> Result<ConversationRecord, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(records.get(conversation_id).cloned().unwrap_or_default())
    }

    fn save(&self, conversation_id: &str, record: &ConversationRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        records.insert(conversation_id.to_string(), record.clone());
        Ok(())
    }
}
