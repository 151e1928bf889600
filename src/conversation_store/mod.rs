//! Conversation and message persistence.

mod models;
mod store;
mod trait_def;

pub use models::{Conversation, Message, MessageRole};
pub use store::SqliteConversationStore;
pub use trait_def::ConversationStore;
