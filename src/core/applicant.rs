//! Applicant selection on published gigs.
//!
//! Applications are rows keyed by `(gig_id, worker_id)`. Accepting one
//! applicant assigns the gig, marks that applicant `accepted` and every other
//! applicant `rejected`, and opens the chat channel, all in one transaction
//! guarded by a conditional write on the gig status.

use super::{
    chat::open_channel,
    gig::{GigLifecycleManager, compare_and_set, ensure_owner, find_gig},
};
use crate::{
    core::identity::Actor,
    entities::{Applicant, ApplicantStatus, GigStatus, Role, applicant, chat, gig},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A worker's application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewApplication {
    /// Why the worker fits the gig
    pub cover_letter: String,
    /// Defaults to the gig budget
    #[serde(default)]
    pub proposed_budget: Option<f64>,
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Gig after the move to `assigned`
    pub gig: gig::Model,
    /// Channel opened for the two parties
    pub chat: chat::Model,
}

impl GigLifecycleManager {
    /// Records `actor`'s application to a published gig.
    ///
    /// A worker can apply to a gig once. A repeated application is a
    /// [`Error::Conflict`] whatever has happened to the gig since.
    #[instrument(skip(self, application), fields(worker = %actor.user_id))]
    pub async fn apply_for_gig(
        &self,
        gig_id: &str,
        actor: &Actor,
        application: NewApplication,
    ) -> Result<applicant::Model> {
        actor.require_role(Role::Student)?;
        let cover_letter = application.cover_letter.trim();
        if cover_letter.is_empty() {
            return Err(Error::validation("Cover letter is required"));
        }
        if let Some(amount) = application.proposed_budget {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;

        let existing = Applicant::find_by_id((gig_id.to_string(), actor.user_id.clone()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(Error::conflict("Already applied to this gig"));
        }
        if current.status != GigStatus::Published {
            return Err(Error::invalid_state("Gig is not accepting applications"));
        }

        let now = self.clock.now();
        // Touching the gig under the status guard serialises applications
        // against a concurrent acceptance.
        compare_and_set(
            &txn,
            gig_id,
            &[GigStatus::Published],
            gig::ActiveModel {
                updated_at: Set(now),
                ..Default::default()
            },
        )
        .await?;

        let position = Applicant::find()
            .filter(applicant::Column::GigId.eq(gig_id))
            .count(&txn)
            .await?;

        let created = applicant::ActiveModel {
            gig_id: Set(gig_id.to_string()),
            worker_id: Set(actor.user_id.clone()),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            applied_at: Set(now),
            cover_letter: Set(cover_letter.to_string()),
            proposed_budget: Set(application.proposed_budget.unwrap_or(current.budget)),
            status: Set(ApplicantStatus::Pending),
            worker_is_premium: Set(actor.is_premium),
        }
        .insert(&txn)
        .await
        .map_err(|e| Error::from_insert(e, "Already applied to this gig"))?;

        txn.commit().await?;
        info!(gig_id, position, "Application received");
        Ok(created)
    }

    /// Assigns a published gig to `worker_id`.
    ///
    /// # Errors
    /// - `Forbidden` if the caller does not own the gig
    /// - `InvalidState` if the gig is not `published`
    /// - `NotFound` if the gig is unknown or the worker never applied
    /// - `Conflict` if another acceptance committed first
    #[instrument(skip(self), fields(client = %actor.user_id))]
    pub async fn accept_applicant(
        &self,
        gig_id: &str,
        actor: &Actor,
        worker_id: &str,
    ) -> Result<Assignment> {
        actor.require_role(Role::Client)?;

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;
        ensure_owner(&current, actor, "accept applicants for")?;
        if current.status != GigStatus::Published {
            return Err(Error::invalid_state(format!(
                "Cannot accept applicants while gig is {:?}",
                current.status
            )));
        }
        Applicant::find_by_id((gig_id.to_string(), worker_id.to_string()))
            .one(&txn)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "Applicant",
                id: worker_id.to_string(),
            })?;

        let now = self.clock.now();
        compare_and_set(
            &txn,
            gig_id,
            &[GigStatus::Published],
            gig::ActiveModel {
                status: Set(GigStatus::Assigned),
                assigned_worker_id: Set(Some(worker_id.to_string())),
                updated_at: Set(now),
                ..Default::default()
            },
        )
        .await?;

        Applicant::update_many()
            .set(applicant::ActiveModel {
                status: Set(ApplicantStatus::Accepted),
                ..Default::default()
            })
            .filter(applicant::Column::GigId.eq(gig_id))
            .filter(applicant::Column::WorkerId.eq(worker_id))
            .exec(&txn)
            .await?;
        let rejected = Applicant::update_many()
            .set(applicant::ActiveModel {
                status: Set(ApplicantStatus::Rejected),
                ..Default::default()
            })
            .filter(applicant::Column::GigId.eq(gig_id))
            .filter(applicant::Column::WorkerId.ne(worker_id))
            .exec(&txn)
            .await?;

        let gig = find_gig(&txn, gig_id).await?;
        let chat = open_channel(&txn, self.ids.as_ref(), now, &gig, worker_id).await?;
        txn.commit().await?;

        info!(
            gig_id,
            worker_id,
            rejected = rejected.rows_affected,
            "Applicant accepted, gig assigned"
        );
        Ok(Assignment { gig, chat })
    }

    /// Applicants of a gig in application order. Owner only.
    pub async fn list_applicants(
        &self,
        gig_id: &str,
        actor: &Actor,
    ) -> Result<Vec<applicant::Model>> {
        let current = find_gig(self.db.as_ref(), gig_id).await?;
        ensure_owner(&current, actor, "view applicants of")?;
        Ok(Applicant::find()
            .filter(applicant::Column::GigId.eq(gig_id))
            .order_by_asc(applicant::Column::Position)
            .all(self.db.as_ref())
            .await?)
    }
}
