//! Applicant entity - A worker's bid on a published gig.
//!
//! The composite key `(gig_id, worker_id)` makes a second application by the
//! same worker impossible at the storage level as well as in the core.

use super::enums::ApplicantStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Applicant database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applicants")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Gig applied to
    #[sea_orm(primary_key, auto_increment = false)]
    pub gig_id: String,
    /// Applying worker, serialized as `studentId`
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "studentId")]
    pub worker_id: String,
    /// Zero-based application order within the gig
    pub position: i32,
    /// When the application arrived
    pub applied_at: DateTimeUtc,
    /// Pitch written by the worker
    pub cover_letter: String,
    /// Defaults to the gig budget when the worker does not propose one
    pub proposed_budget: f64,
    /// `pending` until the gig is assigned
    pub status: ApplicantStatus,
    /// Worker's premium flag when they applied
    pub worker_is_premium: bool,
}

/// Defines relationships between Applicant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each application belongs to one gig
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
