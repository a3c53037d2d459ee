//! Conversation history kept on the client
//!
//! The collection is persisted as one JSON blob and rewritten after every
//! mutation, newest conversation first.

pub mod model;
pub mod store;

pub use model::{
    derive_title, Annotations, Conversation, Message, Role, DEFAULT_CONVERSATION_ID,
    LEGACY_PLACEHOLDER_TITLE, PLACEHOLDER_TITLE, TITLE_MAX_CHARS,
};
pub use store::{Appended, ConversationStore};
