//! ConversationStore trait definition.

use super::models::{Conversation, Message, MessageRole};
use anyhow::Result;

/// Trait for conversation/message storage backends.
///
/// All mutating operations persist durably before returning.
pub trait ConversationStore: Send + Sync {
    /// Create a conversation. A missing title gets a timestamped default.
    fn create_conversation(&self, title: Option<&str>) -> Result<Conversation>;

    /// Append a message to a conversation.
    fn insert_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Message>;

    /// All conversations, most recent first.
    fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// All messages in a conversation, oldest first.
    fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>>;

    /// Delete a conversation and, cascading, all of its messages.
    fn delete_conversation(&self, conversation_id: i64) -> Result<()>;
}
