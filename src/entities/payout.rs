//! Payout entity - Ledger of confirmed milestone releases.
//!
//! A row is written in the same transaction that flips a milestone to
//! `approved`, after the payment gateway has confirmed the release. The
//! commission columns are the commission record for that release.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payout database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payouts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Opaque payout identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// A milestone is released at most once
    #[sea_orm(unique)]
    pub milestone_id: String,
    /// Parent gig
    pub gig_id: String,
    /// Recipient
    pub worker_id: String,
    /// Payer
    pub client_id: String,
    /// Gross milestone amount
    pub amount: f64,
    /// Rate applied to this release
    pub commission_rate: f64,
    /// Platform share of `amount`
    pub commission: f64,
    /// Amount released to the worker
    pub net_amount: f64,
    /// Reference returned by the payment gateway
    pub gateway_reference: String,
    /// When the release was recorded
    pub released_at: DateTimeUtc,
}

/// `Payout` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
