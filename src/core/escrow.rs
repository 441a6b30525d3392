//! Milestone escrow - submission, review and commission-adjusted release.
//!
//! ```text
//! pending -> submitted -> approved            (release)
//!              ^   |
//!              |   v
//!       revision_requested
//! ```
//!
//! Approval flips the milestone, asks the [`PaymentGateway`] to release the
//! net amount and records the payout inside one transaction. If the gateway
//! fails the transaction is rolled back, so a milestone is never `approved`
//! without a confirmed release.

use super::{
    commission::{CommissionCalculator, CommissionRecord, platform_earnings},
    gig::{compare_and_set, ensure_owner, find_gig},
};
use crate::{
    config::{MarketplaceConfig, PremiumSource},
    core::{
        clock::{Clock, IdGenerator},
        identity::Actor,
    },
    entities::{
        Applicant, GigStatus, Milestone, MilestoneStatus, Payout, Role, gig, milestone, payout,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, PaginatorTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What the gateway is asked to pay out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInstruction {
    /// Milestone being paid; also the idempotency key
    pub milestone_id: String,
    /// Parent gig
    pub gig_id: String,
    /// Recipient
    pub worker_id: String,
    /// Payer
    pub client_id: String,
    /// ISO currency code
    pub currency: String,
    /// Commission split of the gross milestone amount
    pub commission: CommissionRecord,
}

impl ReleaseInstruction {
    /// Amount the worker receives.
    #[must_use]
    pub const fn net_amount(&self) -> f64 {
        self.commission.net_amount
    }
}

/// Gateway confirmation of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReceipt {
    /// Gateway-side reference for reconciliation
    pub reference: String,
}

/// External collaborator that moves money out of escrow.
///
/// `release` runs inside the approval transaction, which holds the store's
/// write lock until it returns, so implementations should answer promptly.
/// If recording a confirmed release fails the milestone stays `submitted`
/// and the client may approve again; `milestone_id` is the idempotency key
/// the gateway must deduplicate on.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Releases `instruction.net_amount()` to the worker. Returns only once the
    /// release is confirmed. Repeated calls for the same `milestone_id` must
    /// not pay twice.
    async fn release(&self, instruction: &ReleaseInstruction) -> Result<ReleaseReceipt>;
}

/// Records releases for settlement by an operator. Always confirms.
pub struct ManualPayoutGateway {
    ids: Arc<dyn IdGenerator>,
}

impl ManualPayoutGateway {
    /// Creates a gateway that stamps receipts with ids from `ids`.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl PaymentGateway for ManualPayoutGateway {
    async fn release(&self, instruction: &ReleaseInstruction) -> Result<ReleaseReceipt> {
        let reference = format!("manual-{}", self.ids.next_id());
        info!(
            milestone_id = %instruction.milestone_id,
            worker_id = %instruction.worker_id,
            net_amount = instruction.net_amount(),
            currency = %instruction.currency,
            %reference,
            "Release queued for manual settlement"
        );
        Ok(ReleaseReceipt { reference })
    }
}

/// A worker's delivery for one milestone.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Submission {
    /// http(s) link to the delivered work
    pub submission_url: String,
    /// Free text for the client
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome of an approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    /// Milestone after the move to `approved`
    pub milestone: milestone::Model,
    /// Ledger row for the release
    pub payout: payout::Model,
    /// Whether this approval completed the gig
    pub gig_completed: bool,
}

/// Owns the per-milestone state machine and the release of funds.
#[derive(Clone)]
pub struct MilestoneEscrowEngine {
    db: Arc<DatabaseConnection>,
    calculator: CommissionCalculator,
    premium_source: PremiumSource,
    currency: String,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl MilestoneEscrowEngine {
    /// Builds the engine; fails if the configured commission rates are invalid.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &MarketplaceConfig,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        Ok(Self {
            db,
            calculator: CommissionCalculator::from_config(config)?,
            premium_source: config.premium_discount_source,
            currency: config.currency.clone(),
            gateway,
            clock,
            ids,
        })
    }

    /// Records the assigned worker's delivery. The first submission on an
    /// `assigned` gig moves it to `in_progress`.
    #[instrument(skip(self, submission), fields(worker = %actor.user_id))]
    pub async fn submit(
        &self,
        milestone_id: &str,
        actor: &Actor,
        submission: Submission,
    ) -> Result<milestone::Model> {
        actor.require_role(Role::Student)?;
        let url = submission.submission_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::validation("Submission URL must be an http(s) link"));
        }

        let txn = self.db.begin().await?;
        let current = find_milestone(&txn, milestone_id).await?;
        let gig = find_gig(&txn, &current.gig_id).await?;

        if gig.assigned_worker_id.as_deref() != Some(actor.user_id.as_str()) {
            return Err(Error::forbidden(
                "Only the assigned worker can submit milestones",
            ));
        }
        if !matches!(gig.status, GigStatus::Assigned | GigStatus::InProgress) {
            return Err(Error::invalid_state(format!(
                "Cannot submit work while gig is {:?}",
                gig.status
            )));
        }
        if !matches!(
            current.status,
            MilestoneStatus::Pending | MilestoneStatus::RevisionRequested
        ) {
            return Err(Error::invalid_state(format!(
                "Cannot submit a milestone in status {:?}",
                current.status
            )));
        }

        let now = self.clock.now();
        compare_and_set(
            &txn,
            &gig.id,
            &[gig.status],
            gig::ActiveModel {
                status: Set(GigStatus::InProgress),
                updated_at: Set(now),
                ..Default::default()
            },
        )
        .await?;

        let changes = milestone::ActiveModel {
            status: Set(MilestoneStatus::Submitted),
            submission_url: Set(Some(url.to_string())),
            submission_notes: Set(submission.notes.filter(|n| !n.trim().is_empty())),
            submitted_at: Set(Some(now)),
            ..Default::default()
        };
        let updated = transition_milestone(&txn, &current, changes).await?;
        txn.commit().await?;

        info!(milestone_id, gig_id = %gig.id, "Milestone submitted");
        Ok(updated)
    }

    /// Approves a submitted milestone and releases its net amount.
    ///
    /// # Errors
    /// - `InvalidState` unless the milestone is `submitted` and the gig is
    ///   `in_progress`
    /// - `PaymentGateway` if the release fails; nothing is changed in that case
    #[instrument(skip(self, feedback), fields(client = %actor.user_id))]
    pub async fn approve(
        &self,
        milestone_id: &str,
        actor: &Actor,
        feedback: Option<String>,
    ) -> Result<Approval> {
        actor.require_role(Role::Client)?;

        let txn = self.db.begin().await?;
        let current = find_milestone(&txn, milestone_id).await?;
        let gig = find_gig(&txn, &current.gig_id).await?;
        ensure_owner(&gig, actor, "approve milestones of")?;
        if current.status != MilestoneStatus::Submitted {
            return Err(Error::invalid_state(format!(
                "Cannot approve a milestone in status {:?}",
                current.status
            )));
        }
        if gig.status != GigStatus::InProgress {
            return Err(Error::invalid_state(format!(
                "Cannot approve milestones while gig is {:?}",
                gig.status
            )));
        }
        let worker_id = gig.assigned_worker_id.clone().ok_or_else(|| {
            Error::invalid_state("Gig in progress without an assigned worker")
        })?;

        let is_premium = self.premium_flag(&txn, &gig.id, &worker_id, actor).await?;
        let record = self.calculator.calculate(current.amount, is_premium);

        let now = self.clock.now();
        let changes = milestone::ActiveModel {
            status: Set(MilestoneStatus::Approved),
            feedback: Set(feedback.filter(|f| !f.trim().is_empty())),
            approved_at: Set(Some(now)),
            ..Default::default()
        };
        let approved = transition_milestone(&txn, &current, changes).await?;

        let instruction = ReleaseInstruction {
            milestone_id: current.id.clone(),
            gig_id: gig.id.clone(),
            worker_id: worker_id.clone(),
            client_id: gig.client_id.clone(),
            currency: self.currency.clone(),
            commission: record,
        };
        let receipt = match self.gateway.release(&instruction).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(milestone_id, "Release failed, approval rolled back: {e}");
                return Err(e);
            }
        };

        let reference = receipt.reference;

        // From here on the money has moved; any failure must be reconciled
        // against the gateway reference.
        let recorded = async {
            let payout = payout::ActiveModel {
                id: Set(self.ids.next_id()),
                milestone_id: Set(current.id.clone()),
                gig_id: Set(gig.id.clone()),
                worker_id: Set(worker_id),
                client_id: Set(gig.client_id.clone()),
                amount: Set(record.amount),
                commission_rate: Set(record.commission_rate),
                commission: Set(record.commission),
                net_amount: Set(record.net_amount),
                gateway_reference: Set(reference.clone()),
                released_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| Error::from_insert(e, "Milestone has already been paid out"))?;

            let outstanding = Milestone::find()
                .filter(milestone::Column::GigId.eq(gig.id.as_str()))
                .filter(milestone::Column::Status.ne(MilestoneStatus::Approved))
                .count(&txn)
                .await?;
            let gig_completed = outstanding == 0;
            if gig_completed {
                compare_and_set(
                    &txn,
                    &gig.id,
                    &[GigStatus::InProgress],
                    gig::ActiveModel {
                        status: Set(GigStatus::Completed),
                        completed_at: Set(Some(now)),
                        updated_at: Set(now),
                        ..Default::default()
                    },
                )
                .await?;
            }
            Ok::<_, Error>((payout, gig_completed))
        }
        .await;
        let committed = match recorded {
            Ok(outcome) => txn.commit().await.map(|()| outcome).map_err(Error::from),
            Err(e) => Err(e),
        };
        let (payout, gig_completed) = committed.inspect_err(|e| {
            error!(
                milestone_id,
                %reference,
                "Release confirmed but not recorded: {e}"
            );
        })?;

        info!(
            milestone_id,
            commission = record.commission,
            net_amount = record.net_amount,
            gig_completed,
            "Milestone approved and released"
        );
        Ok(Approval {
            milestone: approved,
            payout,
            gig_completed,
        })
    }

    /// Sends a submitted milestone back to the worker with `feedback`.
    #[instrument(skip(self, feedback), fields(client = %actor.user_id))]
    pub async fn request_revision(
        &self,
        milestone_id: &str,
        actor: &Actor,
        feedback: &str,
    ) -> Result<milestone::Model> {
        actor.require_role(Role::Client)?;
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(Error::validation("Revision feedback is required"));
        }

        let txn = self.db.begin().await?;
        let current = find_milestone(&txn, milestone_id).await?;
        let gig = find_gig(&txn, &current.gig_id).await?;
        ensure_owner(&gig, actor, "review milestones of")?;
        if current.status != MilestoneStatus::Submitted {
            return Err(Error::invalid_state(format!(
                "Cannot request revision of a milestone in status {:?}",
                current.status
            )));
        }

        let changes = milestone::ActiveModel {
            status: Set(MilestoneStatus::RevisionRequested),
            feedback: Set(Some(feedback.to_string())),
            ..Default::default()
        };
        let updated = transition_milestone(&txn, &current, changes).await?;
        txn.commit().await?;

        info!(milestone_id, "Revision requested");
        Ok(updated)
    }

    /// Payouts recorded for a gig, oldest first.
    pub async fn payouts_for_gig(&self, gig_id: &str) -> Result<Vec<payout::Model>> {
        Ok(Payout::find()
            .filter(payout::Column::GigId.eq(gig_id))
            .order_by_asc(payout::Column::ReleasedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Total commission the platform has earned across all releases.
    pub async fn platform_earnings(&self) -> Result<f64> {
        let records: Vec<CommissionRecord> = Payout::find()
            .all(self.db.as_ref())
            .await?
            .iter()
            .map(|p| CommissionRecord {
                amount: p.amount,
                commission_rate: p.commission_rate,
                commission: p.commission,
                net_amount: p.net_amount,
            })
            .collect();
        Ok(platform_earnings(&records))
    }

    async fn premium_flag(
        &self,
        txn: &DatabaseTransaction,
        gig_id: &str,
        worker_id: &str,
        client: &Actor,
    ) -> Result<bool> {
        match self.premium_source {
            PremiumSource::Client => Ok(client.is_premium),
            PremiumSource::Worker => Ok(Applicant::find_by_id((
                gig_id.to_string(),
                worker_id.to_string(),
            ))
            .one(txn)
            .await?
            .is_some_and(|a| a.worker_is_premium)),
        }
    }
}

async fn find_milestone<C: ConnectionTrait>(
    conn: &C,
    milestone_id: &str,
) -> Result<milestone::Model> {
    Milestone::find_by_id(milestone_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Milestone",
            id: milestone_id.to_string(),
        })
}

/// Writes `changes` only if the milestone still has the status it was read
/// with, then returns the updated row.
async fn transition_milestone<C: ConnectionTrait>(
    conn: &C,
    current: &milestone::Model,
    changes: milestone::ActiveModel,
) -> Result<milestone::Model> {
    let result = Milestone::update_many()
        .set(changes)
        .filter(milestone::Column::Id.eq(current.id.as_str()))
        .filter(milestone::Column::Status.eq(current.status))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        warn!(milestone_id = %current.id, "Milestone transition lost to a concurrent update");
        return Err(Error::conflict(format!(
            "Milestone {} was modified concurrently",
            current.id
        )));
    }
    find_milestone(conn, &current.id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use std::sync::Mutex;

    /// Remembers every instruction it confirms.
    #[derive(Default)]
    struct RecordingGateway {
        released: Mutex<Vec<ReleaseInstruction>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn release(&self, instruction: &ReleaseInstruction) -> Result<ReleaseReceipt> {
            let mut released = self.released.lock().unwrap();
            released.push(instruction.clone());
            Ok(ReleaseReceipt {
                reference: format!("rec-{}", released.len()),
            })
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl PaymentGateway for FailingGateway {
        async fn release(&self, _instruction: &ReleaseInstruction) -> Result<ReleaseReceipt> {
            Err(Error::PaymentGateway {
                message: "gateway timeout".to_string(),
            })
        }
    }

    fn submission() -> Submission {
        Submission {
            submission_url: "https://files.test/delivery.zip".to_string(),
            notes: Some("first cut".to_string()),
        }
    }

    #[tokio::test]
    async fn test_full_escrow_flow_completes_gig() -> Result<()> {
        let gateway = Arc::new(RecordingGateway::default());
        let env = TestEnv::with_gateway(gateway.clone()).await?;
        let client = Actor::client("client-1");
        let worker = Actor::student("student-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestones = env.gigs.get(&gig.id).await?.milestones;
        assert_eq!(milestones.len(), 2);

        let submitted = env
            .escrow
            .submit(&milestones[0].id, &worker, submission())
            .await?;
        assert_eq!(submitted.status, MilestoneStatus::Submitted);
        assert_eq!(submitted.submitted_at, Some(env.clock.now()));
        assert_eq!(
            env.gigs.get(&gig.id).await?.gig.status,
            GigStatus::InProgress
        );

        let first = env.escrow.approve(&milestones[0].id, &client, None).await?;
        assert_eq!(first.milestone.status, MilestoneStatus::Approved);
        assert!(!first.gig_completed);
        assert_eq!(first.payout.commission_rate, 0.15);
        assert_eq!(first.payout.commission, round_split(milestones[0].amount).0);
        assert_eq!(first.payout.gateway_reference, "rec-1");

        env.escrow
            .submit(&milestones[1].id, &worker, submission())
            .await?;
        let second = env
            .escrow
            .approve(&milestones[1].id, &client, Some("great".to_string()))
            .await?;
        assert!(second.gig_completed);
        assert_eq!(second.milestone.feedback.as_deref(), Some("great"));

        let finished = env.gigs.get(&gig.id).await?.gig;
        assert_eq!(finished.status, GigStatus::Completed);
        assert_eq!(finished.completed_at, Some(env.clock.now()));

        let released = gateway.released.lock().unwrap().clone();
        assert_eq!(released.len(), 2);
        assert_eq!(released[0].worker_id, "student-1");
        assert_eq!(released[0].currency, "INR");
        assert_eq!(released[0].net_amount(), first.payout.net_amount);

        let total = milestones.iter().map(|m| round_split(m.amount).0).sum::<f64>();
        assert_eq!(env.escrow.platform_earnings().await?, total);
        assert_eq!(env.escrow.payouts_for_gig(&gig.id).await?.len(), 2);
        Ok(())
    }

    fn round_split(amount: f64) -> (f64, f64) {
        let record = CommissionCalculator::new(0.15, 0.10)
            .unwrap()
            .calculate(amount, false);
        (record.commission, record.net_amount)
    }

    #[tokio::test]
    async fn test_failed_release_leaves_milestone_submitted() -> Result<()> {
        let env = TestEnv::with_gateway(Arc::new(FailingGateway)).await?;
        let client = Actor::client("client-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();

        env.escrow
            .submit(&milestone_id, &Actor::student("student-1"), submission())
            .await?;
        let err = env
            .escrow
            .approve(&milestone_id, &client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PaymentGateway { .. }));
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let after = env.gigs.get(&gig.id).await?;
        assert_eq!(after.milestones[0].status, MilestoneStatus::Submitted);
        assert_eq!(after.milestones[0].approved_at, None);
        assert_eq!(after.gig.status, GigStatus::InProgress);
        assert!(env.escrow.payouts_for_gig(&gig.id).await?.is_empty());
        assert_eq!(env.escrow.platform_earnings().await?, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unrecorded_release_rolls_back_and_retries_same_key() -> Result<()> {
        let gateway = Arc::new(RecordingGateway::default());
        let env = TestEnv::with_gateway(gateway.clone()).await?;
        let client = Actor::client("client-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();
        env.escrow
            .submit(&milestone_id, &Actor::student("student-1"), submission())
            .await?;

        // A ledger row already claims this milestone, so recording fails
        let stray = payout::ActiveModel {
            id: Set("stray".to_string()),
            milestone_id: Set(milestone_id.clone()),
            gig_id: Set(gig.id.clone()),
            worker_id: Set("student-1".to_string()),
            client_id: Set("client-1".to_string()),
            amount: Set(0.0),
            commission_rate: Set(0.0),
            commission: Set(0.0),
            net_amount: Set(0.0),
            gateway_reference: Set("stray".to_string()),
            released_at: Set(env.clock.now()),
        }
        .insert(env.db.as_ref())
        .await?;

        let err = env
            .escrow
            .approve(&milestone_id, &client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        let after = env.gigs.get(&gig.id).await?;
        assert_eq!(after.milestones[0].status, MilestoneStatus::Submitted);

        stray.delete(env.db.as_ref()).await?;
        env.escrow.approve(&milestone_id, &client, None).await?;

        let released = gateway.released.lock().unwrap().clone();
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|r| r.milestone_id == milestone_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_revision_cycle() -> Result<()> {
        let env = TestEnv::new().await?;
        let client = Actor::client("client-1");
        let worker = Actor::student("student-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();

        // Nothing to review yet
        let err = env
            .escrow
            .request_revision(&milestone_id, &client, "redo")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        env.escrow.submit(&milestone_id, &worker, submission()).await?;
        let err = env
            .escrow
            .submit(&milestone_id, &worker, submission())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        let err = env
            .escrow
            .request_revision(&milestone_id, &client, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let revised = env
            .escrow
            .request_revision(&milestone_id, &client, "Use the brand colours")
            .await?;
        assert_eq!(revised.status, MilestoneStatus::RevisionRequested);
        assert_eq!(revised.feedback.as_deref(), Some("Use the brand colours"));

        let err = env
            .escrow
            .approve(&milestone_id, &client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        let resubmitted = env.escrow.submit(&milestone_id, &worker, submission()).await?;
        assert_eq!(resubmitted.status, MilestoneStatus::Submitted);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_and_approve_authorization() -> Result<()> {
        let env = TestEnv::new().await?;
        let client = Actor::client("client-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();

        let err = env
            .escrow
            .submit(&milestone_id, &Actor::student("student-2"), submission())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let bad_url = Submission {
            submission_url: "ftp://files.test/x".to_string(),
            notes: None,
        };
        let err = env
            .escrow
            .submit(&milestone_id, &Actor::student("student-1"), bad_url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        env.escrow
            .submit(&milestone_id, &Actor::student("student-1"), submission())
            .await?;
        let err = env
            .escrow
            .approve(&milestone_id, &Actor::client("client-2"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let err = env
            .escrow
            .approve("missing", &client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Milestone", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_requires_assigned_or_in_progress_gig() -> Result<()> {
        let env = TestEnv::new().await?;
        let client = Actor::client("client-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();

        env.gigs.dispute(&gig.id, &client).await?;
        let err = env
            .escrow
            .submit(&milestone_id, &Actor::student("student-1"), submission())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_premium_client_gets_discount() -> Result<()> {
        let env = TestEnv::new().await?;
        let client = Actor::client("client-1");
        let gig = env.assigned_gig(&client, "student-1").await?;
        let milestone = env.gigs.get(&gig.id).await?.milestones[0].clone();

        env.escrow
            .submit(&milestone.id, &Actor::student("student-1"), submission())
            .await?;
        let approval = env
            .escrow
            .approve(&milestone.id, &client.clone().premium(), None)
            .await?;
        assert_eq!(approval.payout.commission_rate, 0.10);
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_premium_source_uses_application_flag() -> Result<()> {
        let config = MarketplaceConfig {
            premium_discount_source: PremiumSource::Worker,
            ..MarketplaceConfig::default()
        };
        let env = TestEnv::with_config(config).await?;
        // Standard-tier client, premium worker
        let client = Actor::client("client-1");
        let gig = env.published_gig(&client).await?;
        env.gigs
            .apply_for_gig(&gig.id, &Actor::student("student-1").premium(), application(None))
            .await?;
        env.gigs.accept_applicant(&gig.id, &client, "student-1").await?;
        let milestone_id = env.gigs.get(&gig.id).await?.milestones[0].id.clone();

        env.escrow
            .submit(&milestone_id, &Actor::student("student-1"), submission())
            .await?;
        let approval = env.escrow.approve(&milestone_id, &client, None).await?;
        assert_eq!(approval.payout.commission_rate, 0.10);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_gateway_confirms_with_reference() -> Result<()> {
        let gateway = ManualPayoutGateway::new(Arc::new(SequentialIds::new("payout")));
        let instruction = ReleaseInstruction {
            milestone_id: "m-1".to_string(),
            gig_id: "g-1".to_string(),
            worker_id: "s-1".to_string(),
            client_id: "c-1".to_string(),
            currency: "INR".to_string(),
            commission: CommissionCalculator::new(0.15, 0.10)?.calculate(1000.0, false),
        };
        let receipt = gateway.release(&instruction).await?;
        assert_eq!(receipt.reference, "manual-payout-1");
        assert_eq!(instruction.net_amount(), 850.0);
        Ok(())
    }
}
