//! Chat channels between a client and the worker accepted for their gig.
//!
//! A channel is opened inside the acceptance transaction and is the only way
//! the two parties can talk. Every message is screened by
//! [`chat_filter`](super::chat_filter) before it is stored.

use crate::{
    core::{
        chat_filter::{Screening, screen_message},
        clock::{Clock, IdGenerator},
        identity::Actor,
    },
    entities::{Chat, ChatMessage, chat, chat_message, gig},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, ConnectionTrait, QueryOrder, Set, prelude::*};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Opens the single channel for `gig` between its owner and `worker_id`.
///
/// A second channel for the same gig violates the unique gig column and is
/// reported as [`Error::Conflict`].
pub(crate) async fn open_channel<C: ConnectionTrait>(
    conn: &C,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
    gig: &gig::Model,
    worker_id: &str,
) -> Result<chat::Model> {
    let chat = chat::ActiveModel {
        id: Set(ids.next_id()),
        gig_id: Set(gig.id.clone()),
        client_id: Set(gig.client_id.clone()),
        worker_id: Set(worker_id.to_string()),
        is_active: Set(true),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| Error::from_insert(e, format!("A chat already exists for gig {}", gig.id)))?;

    info!(chat_id = %chat.id, gig_id = %gig.id, "Chat channel opened");
    Ok(chat)
}

/// Stores and lists chat messages.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ChatService {
    /// Creates a service over `db`.
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { db, clock, ids }
    }

    /// Screens and stores a message.
    ///
    /// # Errors
    /// - `MessageBlocked` if the text arranges payment around the platform;
    ///   nothing is stored in that case
    /// - `Forbidden` if the caller is not a participant
    /// - `InvalidState` if the chat has been closed
    #[instrument(skip(self, content), fields(sender = %actor.user_id))]
    pub async fn send_message(
        &self,
        chat_id: &str,
        actor: &Actor,
        content: &str,
    ) -> Result<chat_message::Model> {
        if content.trim().is_empty() {
            return Err(Error::validation("Message cannot be empty"));
        }

        let chat = self.find_participant_chat(chat_id, actor).await?;
        if !chat.is_active {
            return Err(Error::invalid_state("Chat is closed"));
        }

        let screened = match screen_message(content) {
            Screening::Blocked => {
                warn!(chat_id, "Blocked attempt to arrange off-platform payment");
                return Err(Error::MessageBlocked);
            }
            Screening::Deliver(result) => result,
        };

        let message = chat_message::ActiveModel {
            id: Set(self.ids.next_id()),
            chat_id: Set(chat.id.clone()),
            sender_id: Set(actor.user_id.clone()),
            sender_role: Set(actor.role),
            content: Set(screened.filtered),
            is_filtered: Set(screened.is_filtered),
            sent_at: Set(self.clock.now()),
        }
        .insert(self.db.as_ref())
        .await?;

        if message.is_filtered {
            info!(chat_id, message_id = %message.id, "Message stored with redactions");
        }
        Ok(message)
    }

    /// Messages of a chat, oldest first. Participants only.
    pub async fn list_messages(
        &self,
        chat_id: &str,
        actor: &Actor,
    ) -> Result<Vec<chat_message::Model>> {
        let chat = self.find_participant_chat(chat_id, actor).await?;
        Ok(chat
            .find_related(ChatMessage)
            .order_by_asc(chat_message::Column::SentAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Chats the caller takes part in, newest first.
    pub async fn list_chats(&self, actor: &Actor) -> Result<Vec<chat::Model>> {
        Ok(Chat::find()
            .filter(
                Condition::any()
                    .add(chat::Column::ClientId.eq(actor.user_id.as_str()))
                    .add(chat::Column::WorkerId.eq(actor.user_id.as_str())),
            )
            .order_by_desc(chat::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    async fn find_participant_chat(&self, chat_id: &str, actor: &Actor) -> Result<chat::Model> {
        let chat = Chat::find_by_id(chat_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "Chat",
                id: chat_id.to_string(),
            })?;
        if !chat.is_participant(&actor.user_id) {
            return Err(Error::forbidden("Not a participant of this chat"));
        }
        Ok(chat)
    }
}
