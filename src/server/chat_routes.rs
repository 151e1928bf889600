//! Chat and conversation HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::audio_routes::ErrorResponse;
use super::state::ServerState;
use crate::conversation_store::MessageRole;
use crate::llm::ChatModes;

const TITLE_MAX_CHARS: usize = 30;
const HISTORY_MESSAGES: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub prompt: String,
    pub conversation_id: Option<i64>,
    #[serde(default)]
    pub modes: ChatModes,
    #[serde(default)]
    pub lyrics: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: i64,
}

/// POST /api/chat - Send a chat message
async fn chat(State(state): State<ServerState>, Json(body): Json<ChatBody>) -> impl IntoResponse {
    let prompt = body.prompt.trim();

    // A prompt-less request is valid when lyrics are attached for analysis.
    if prompt.is_empty() && body.lyrics.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Prompt is required".to_string(),
            }),
        )
            .into_response();
    }

    let conversation_id = match body.conversation_id {
        Some(id) => id,
        None => {
            let title = if prompt.is_empty() {
                "Lyric Check".to_string()
            } else {
                truncate_title(prompt)
            };
            match state.store.create_conversation(Some(&title)) {
                Ok(conv) => conv.id,
                Err(e) => {
                    warn!("Failed to create conversation: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse {
                            error: "Failed to create conversation".to_string(),
                        }),
                    )
                        .into_response();
                }
            }
        }
    };

    let history = match state.store.get_messages(conversation_id) {
        Ok(messages) => {
            let skip = messages.len().saturating_sub(HISTORY_MESSAGES);
            messages
                .into_iter()
                .skip(skip)
                .map(|m| match m.role {
                    MessageRole::User => format!("User: {}", m.content),
                    MessageRole::Assistant => format!("Assistant: {}", m.content),
                })
                .collect::<Vec<_>>()
        }
        Err(e) => {
            warn!("Failed to load history for {}: {}", conversation_id, e);
            Vec::new()
        }
    };

    let reply = state
        .advisor
        .generate_chat(prompt, body.modes, &body.lyrics, &history)
        .await;

    let user_content = if body.modes.lyric_verify && !body.lyrics.is_empty() {
        let heading = if prompt.is_empty() {
            "Verify lyrics"
        } else {
            prompt
        };
        format!("[Lyric Check] {}\n\nLyrics:\n{}", heading, body.lyrics)
    } else {
        prompt.to_string()
    };

    if let Err(e) = state
        .store
        .insert_message(conversation_id, MessageRole::User, &user_content)
        .and_then(|_| {
            state
                .store
                .insert_message(conversation_id, MessageRole::Assistant, &reply)
        })
    {
        warn!("Failed to persist chat messages: {}", e);
    }

    Json(ChatResponse {
        reply,
        conversation_id,
    })
    .into_response()
}

/// GET /api/conversations - List conversations, newest first
async fn list_conversations(State(state): State<ServerState>) -> impl IntoResponse {
    match state.store.list_conversations() {
        Ok(conversations) => Json(conversations).into_response(),
        Err(e) => {
            warn!("Failed to list conversations: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to list conversations".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /api/conversations/{id}/messages - Messages in a conversation, oldest first
async fn get_messages(
    State(state): State<ServerState>,
    Path(conversation_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_messages(conversation_id) {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            warn!(
                "Failed to get messages for conversation {}: {}",
                conversation_id, e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to get messages".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /api/conversations/{id} - Delete a conversation and its messages
async fn delete_conversation(
    State(state): State<ServerState>,
    Path(conversation_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_conversation(conversation_id) {
        Ok(()) => {
            info!("Deleted conversation {}", conversation_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            warn!("Failed to delete conversation {}: {}", conversation_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to delete conversation".to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn truncate_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    }
}

/// Build the chat and conversation routes.
///
/// - POST /chat - Send a chat message
/// - GET /conversations - List conversations
/// - GET /conversations/{id}/messages - Get conversation messages
/// - DELETE /conversations/{id} - Delete a conversation
pub fn chat_routes() -> Router<ServerState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/conversations", get(list_conversations))
        .route("/conversations/{id}/messages", get(get_messages))
        .route("/conversations/{id}", axum::routing::delete(delete_conversation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short"), "short");
        assert_eq!(
            truncate_title("how do I get my vocals to sit in the mix properly?"),
            "how do I get my vocals to sit ..."
        );
        assert_eq!(truncate_title("  padded  "), "padded");
    }
}
