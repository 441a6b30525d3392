//! Gig entity - A posted unit of work with a budget and a milestone breakdown.
//!
//! The gig row carries the lifecycle status; its milestones and applicants live
//! in their own tables keyed by `gig_id` and are always read back in `position`
//! order.

use super::enums::{ExperienceLevel, GigStatus};
use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Skills a gig asks for, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct SkillSet(pub BTreeSet<String>);

impl<S: Into<String>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Gig database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gigs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque gig identifier
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(rename = "gigId")]
    pub id: String,
    /// Owning client
    pub client_id: String,
    /// Listing headline
    pub title: String,
    /// Full brief
    pub description: String,
    /// Marketplace category
    pub category: String,
    /// Total budget, two-decimal currency amount
    pub budget: f64,
    /// ISO currency code
    pub currency: String,
    /// Lifecycle state
    pub status: GigStatus,
    /// Final delivery date
    pub deadline: DateTimeUtc,
    /// Skill tags, stored as JSON
    #[sea_orm(column_type = "Json")]
    pub skills_required: SkillSet,
    /// Expected worker level
    pub experience_level: ExperienceLevel,
    /// Set by a premium client; see `featured_until`
    pub is_featured: bool,
    /// End of the featured window
    pub featured_until: Option<DateTimeUtc>,
    /// Worker accepted for this gig, set when the gig leaves `published`
    pub assigned_worker_id: Option<String>,
    /// When the last milestone was approved
    pub completed_at: Option<DateTimeUtc>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last write
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Gig and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One gig has many milestones
    #[sea_orm(has_many = "super::milestone::Entity")]
    Milestones,
    /// One gig has many applicants
    #[sea_orm(has_many = "super::applicant::Entity")]
    Applicants,
}

impl Related<super::milestone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Milestones.def()
    }
}

impl Related<super::applicant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applicants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
