//! Chat endpoints.

use crate::{
    api::{error::json_body, state::AppState},
    core::Actor,
    entities::{ChatMessageModel, ChatModel},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

/// Body of `POST /api/chats/{id}/messages`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    /// Raw text; screened before it is stored
    pub content: String,
}

/// Chats the caller takes part in.
pub async fn list_chats(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<ChatModel>>> {
    Ok(Json(state.chats.list_chats(&actor).await?))
}

/// Messages of one chat, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    actor: Actor,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<ChatMessageModel>>> {
    Ok(Json(state.chats.list_messages(&chat_id, &actor).await?))
}

/// Screens and stores a message. Blocked messages are a 400.
pub async fn send_message(
    State(state): State<AppState>,
    actor: Actor,
    Path(chat_id): Path<String>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatMessageModel>)> {
    let request = json_body(payload)?;
    let message = state
        .chats
        .send_message(&chat_id, &actor, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
