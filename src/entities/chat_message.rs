//! Chat message entity - A message as stored after content filtering.
//!
//! Only the sanitised text is persisted; `is_filtered` records whether any
//! redaction was applied.

use super::enums::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chat message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_messages")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque message identifier
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "messageId")]
    pub id: String,
    /// Parent chat
    pub chat_id: String,
    /// Author
    pub sender_id: String,
    /// Role the author sent as
    pub sender_role: Role,
    /// Filtered message text
    pub content: String,
    /// Whether any redaction was applied
    pub is_filtered: bool,
    /// When the message was stored
    pub sent_at: DateTimeUtc,
}

/// Defines relationships between `ChatMessage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each message belongs to one chat
    #[sea_orm(
        belongs_to = "super::chat::Entity",
        from = "Column::ChatId",
        to = "super::chat::Column::Id"
    )]
    Chat,
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
