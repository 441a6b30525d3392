//! Posted gig entity - The set of gig ids each client owns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Posted gig database model - one row per (client, gig)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posted_gigs")]
pub struct Model {
    /// Posting client
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: String,
    /// Gig they posted
    #[sea_orm(primary_key, auto_increment = false)]
    pub gig_id: String,
}

/// `PostedGig` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
