//! Conversation state storage adapters

mod memory;

pub use memory::InMemoryConversationStore;
