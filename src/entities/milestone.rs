//! Milestone entity - A sub-deliverable of a gig and the unit of escrow release.
//!
//! Milestones are created together with their gig and are never deleted on
//! their own; only the assigned worker (submit) and the owning client
//! (approve, request revision) move them between statuses.

use super::enums::MilestoneStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Milestone database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "milestones")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque milestone identifier, generated with the gig
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "milestoneId")]
    pub id: String,
    /// Parent gig
    pub gig_id: String,
    /// Zero-based position in the gig's breakdown
    pub position: i32,
    /// Short name shown to the worker
    pub title: String,
    /// What is delivered
    pub description: String,
    /// Share of the gig budget released when this milestone is approved
    pub amount: f64,
    /// When the deliverable is due
    pub due_date: DateTimeUtc,
    /// Review state
    pub status: MilestoneStatus,
    /// Link to the delivered work
    pub submission_url: Option<String>,
    /// Worker notes on the latest submission
    pub submission_notes: Option<String>,
    /// Latest submission time
    pub submitted_at: Option<DateTimeUtc>,
    /// Client feedback from the latest approval or revision request
    pub feedback: Option<String>,
    /// When the client approved and funds were released
    pub approved_at: Option<DateTimeUtc>,
}

/// Defines relationships between Milestone and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each milestone belongs to one gig
    #[sea_orm(
        belongs_to = "super::gig::Entity",
        from = "Column::GigId",
        to = "super::gig::Column::Id"
    )]
    Gig,
}

impl Related<super::gig::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
