//! Chat entity - The single conversation channel opened when a client accepts
//! a worker for a gig.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chat database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chats")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque chat identifier
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "chatId")]
    pub id: String,
    /// At most one chat exists per gig
    #[sea_orm(unique)]
    pub gig_id: String,
    /// Gig owner
    pub client_id: String,
    /// Accepted worker, serialized as `studentId`
    #[serde(rename = "studentId")]
    pub worker_id: String,
    /// Closed chats refuse new messages
    pub is_active: bool,
    /// When the applicant was accepted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Chat and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One chat has many messages
    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `user_id` is the client or the worker of this chat.
    #[must_use]
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.worker_id == user_id
    }
}
