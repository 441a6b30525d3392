//! Gig lifecycle - creation, editing, publishing and the status machine.
//!
//! ```text
//! draft -> published -> assigned -> in_progress -> completed
//!   |          |
//!   |          +-> cancelled
//!   +-> (deleted)
//! published | assigned | in_progress -> disputed
//! ```
//!
//! Every transition reads the gig, checks the caller and the current status,
//! and then writes with a conditional update that only matches the status it
//! read. A write that matches no row lost a race and fails with
//! [`Error::Conflict`]. Application handling lives in
//! [`applicant`](super::applicant); milestone payouts in
//! [`escrow`](super::escrow).

use crate::{
    config::MarketplaceConfig,
    core::{
        clock::{Clock, IdGenerator},
        identity::Actor,
        milestone_validator::MilestoneValidator,
    },
    entities::{
        Applicant, ExperienceLevel, Gig, GigStatus, Milestone, MilestoneStatus, PostedGig, Role,
        SkillSet, applicant, gig, milestone, posted_gig,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One entry of a milestone breakdown as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMilestone {
    /// Short name shown to the worker
    pub title: String,
    /// What is delivered
    #[serde(default)]
    pub description: String,
    /// Share of the gig budget
    pub amount: f64,
    /// When the deliverable is due
    pub due_date: DateTime<Utc>,
}

/// Everything needed to create a gig.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewGig {
    /// Listing headline
    pub title: String,
    /// Full brief
    pub description: String,
    /// Marketplace category, e.g. "Web Development"
    pub category: String,
    /// Total budget; at least the configured minimum
    pub budget: f64,
    /// Final delivery date
    pub deadline: DateTime<Utc>,
    /// Skill tags
    #[serde(default)]
    pub skills_required: Vec<String>,
    /// Expected worker level
    #[serde(default)]
    pub experience_level: ExperienceLevel,
    /// Breakdown summing to 90-100 % of the budget
    pub milestones: Vec<NewMilestone>,
}

/// Fields a client may change while a gig is still a draft or published.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GigPatch {
    /// New headline
    pub title: Option<String>,
    /// New brief
    pub description: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New budget; the breakdown is revalidated against it
    pub budget: Option<f64>,
    /// New final delivery date
    pub deadline: Option<DateTime<Utc>>,
    /// New skill tags
    pub skills_required: Option<Vec<String>>,
    /// New expected level
    pub experience_level: Option<ExperienceLevel>,
    /// Replaces the whole breakdown
    pub milestones: Option<Vec<NewMilestone>>,
}

/// Listing predicates. Equality filters run in the store; budget range and
/// free-text search are applied to the result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GigFilter {
    /// Exact category
    pub category: Option<String>,
    /// Exact level
    pub experience_level: Option<ExperienceLevel>,
    /// Exact status
    pub status: Option<GigStatus>,
    /// Inclusive lower budget bound
    pub min_budget: Option<f64>,
    /// Inclusive upper budget bound
    pub max_budget: Option<f64>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl GigFilter {
    fn matches_in_memory(&self, gig: &gig::Model) -> bool {
        if self.min_budget.is_some_and(|min| gig.budget < min) {
            return false;
        }
        if self.max_budget.is_some_and(|max| gig.budget > max) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                gig.title.to_lowercase().contains(&term)
                    || gig.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// A gig with its ordered milestones and applicants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GigDetails {
    /// The gig row
    #[serde(flatten)]
    pub gig: gig::Model,
    /// Breakdown in position order
    pub milestones: Vec<milestone::Model>,
    /// Applications in arrival order
    pub applicants: Vec<applicant::Model>,
}

/// Owns the gig status machine.
#[derive(Clone)]
pub struct GigLifecycleManager {
    pub(super) db: Arc<DatabaseConnection>,
    pub(super) config: Arc<MarketplaceConfig>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
    validator: MilestoneValidator,
}

impl GigLifecycleManager {
    /// Creates a manager over `db` with the given configuration and time/id sources.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<MarketplaceConfig>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            db,
            config,
            clock,
            ids,
            validator: MilestoneValidator,
        }
    }

    /// Creates a gig in `draft` and registers it in the client's posted set.
    ///
    /// # Errors
    /// - `Forbidden` if the caller is not a client
    /// - `Validation`/`InvalidAmount` for missing fields, a budget under the
    ///   configured minimum, or a milestone breakdown outside 90-100% of budget
    #[instrument(skip(self, new_gig), fields(client = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, new_gig: NewGig) -> Result<GigDetails> {
        actor.require_role(Role::Client)?;
        self.validate_new_gig(&new_gig)?;

        let now = self.clock.now();
        let gig_id = self.ids.next_id();

        let txn = self.db.begin().await?;

        let gig = gig::ActiveModel {
            id: Set(gig_id.clone()),
            client_id: Set(actor.user_id.clone()),
            title: Set(new_gig.title.trim().to_string()),
            description: Set(new_gig.description.trim().to_string()),
            category: Set(new_gig.category.trim().to_string()),
            budget: Set(new_gig.budget),
            currency: Set(self.config.currency.clone()),
            status: Set(GigStatus::Draft),
            deadline: Set(new_gig.deadline),
            skills_required: Set(new_gig.skills_required.into_iter().collect()),
            experience_level: Set(new_gig.experience_level),
            is_featured: Set(false),
            featured_until: Set(None),
            assigned_worker_id: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let milestones = self
            .insert_milestones(&txn, &gig_id, &new_gig.milestones)
            .await?;

        posted_gig::ActiveModel {
            client_id: Set(actor.user_id.clone()),
            gig_id: Set(gig_id.clone()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            gig_id = %gig.id,
            budget = gig.budget,
            milestones = milestones.len(),
            "Gig created in draft"
        );
        Ok(GigDetails {
            gig,
            milestones,
            applicants: Vec::new(),
        })
    }

    /// Applies `patch` to a gig that is still `draft` or `published`.
    ///
    /// Changing the budget or the milestones re-runs budget and breakdown
    /// validation; a new breakdown replaces the old one entirely.
    #[instrument(skip(self, patch), fields(user = %actor.user_id))]
    pub async fn update(&self, gig_id: &str, actor: &Actor, patch: GigPatch) -> Result<GigDetails> {
        actor.require_role(Role::Client)?;

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;
        ensure_owner(&current, actor, "update")?;
        if !current.status.is_editable() {
            return Err(Error::invalid_state(format!(
                "Cannot update gig in status {:?}",
                current.status
            )));
        }

        let mut changes = gig::ActiveModel {
            updated_at: Set(self.clock.now()),
            ..Default::default()
        };
        if let Some(title) = patch.title {
            changes.title = Set(required_text("title", &title)?);
        }
        if let Some(description) = patch.description {
            changes.description = Set(required_text("description", &description)?);
        }
        if let Some(category) = patch.category {
            changes.category = Set(required_text("category", &category)?);
        }
        if let Some(deadline) = patch.deadline {
            changes.deadline = Set(deadline);
        }
        if let Some(skills) = patch.skills_required {
            changes.skills_required = Set(skills.into_iter().collect::<SkillSet>());
        }
        if let Some(level) = patch.experience_level {
            changes.experience_level = Set(level);
        }

        let budget = patch.budget.unwrap_or(current.budget);
        if patch.budget.is_some() {
            self.validate_budget(budget)?;
            changes.budget = Set(budget);
        }
        if let Some(new_milestones) = &patch.milestones {
            validate_milestone_inputs(new_milestones)?;
            self.validator
                .validate(new_milestones.iter().map(|m| m.amount), budget)
                .into_result()?;
        } else if patch.budget.is_some() {
            let existing = Milestone::find()
                .filter(milestone::Column::GigId.eq(gig_id))
                .all(&txn)
                .await?;
            self.validator
                .validate(existing.iter().map(|m| m.amount), budget)
                .into_result()?;
        }

        compare_and_set(&txn, gig_id, &[current.status], changes).await?;

        if let Some(new_milestones) = &patch.milestones {
            Milestone::delete_many()
                .filter(milestone::Column::GigId.eq(gig_id))
                .exec(&txn)
                .await?;
            self.insert_milestones(&txn, gig_id, new_milestones).await?;
        }

        let details = load_details(&txn, find_gig(&txn, gig_id).await?).await?;
        txn.commit().await?;

        info!(gig_id, "Gig updated");
        Ok(details)
    }

    /// Deletes a `draft` gig together with its milestones and removes it from
    /// the owner's posted set.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn delete(&self, gig_id: &str, actor: &Actor) -> Result<()> {
        actor.require_role(Role::Client)?;

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;
        ensure_owner(&current, actor, "delete")?;
        if current.status != GigStatus::Draft {
            return Err(Error::invalid_state("Can only delete draft gigs"));
        }

        Milestone::delete_many()
            .filter(milestone::Column::GigId.eq(gig_id))
            .exec(&txn)
            .await?;
        Applicant::delete_many()
            .filter(applicant::Column::GigId.eq(gig_id))
            .exec(&txn)
            .await?;

        let deleted = Gig::delete_many()
            .filter(gig::Column::Id.eq(gig_id))
            .filter(gig::Column::Status.eq(GigStatus::Draft))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            warn!(gig_id, "Gig left draft while being deleted");
            return Err(Error::conflict(format!(
                "Gig {gig_id} was modified concurrently"
            )));
        }

        PostedGig::delete_many()
            .filter(posted_gig::Column::ClientId.eq(actor.user_id.as_str()))
            .filter(posted_gig::Column::GigId.eq(gig_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(gig_id, "Draft gig deleted");
        Ok(())
    }

    /// Moves a gig from `draft` to `published`. Publishing twice fails.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn publish(&self, gig_id: &str, actor: &Actor) -> Result<gig::Model> {
        self.owner_transition(gig_id, actor, &[GigStatus::Draft], GigStatus::Published)
            .await
    }

    /// Withdraws a gig that has not been assigned yet.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn cancel(&self, gig_id: &str, actor: &Actor) -> Result<gig::Model> {
        self.owner_transition(
            gig_id,
            actor,
            &[GigStatus::Draft, GigStatus::Published],
            GigStatus::Cancelled,
        )
        .await
    }

    /// Escalates a gig to the external dispute process. Either the owning
    /// client or the assigned worker may raise a dispute.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn dispute(&self, gig_id: &str, actor: &Actor) -> Result<gig::Model> {
        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;

        let is_owner = current.client_id == actor.user_id;
        let is_worker = current.assigned_worker_id.as_deref() == Some(actor.user_id.as_str());
        if !is_owner && !is_worker {
            return Err(Error::forbidden("Only the client or the assigned worker can dispute a gig"));
        }
        if current.status.is_terminal() || current.status == GigStatus::Draft {
            return Err(Error::invalid_state(format!(
                "Cannot dispute a gig in status {:?}",
                current.status
            )));
        }

        let changes = gig::ActiveModel {
            status: Set(GigStatus::Disputed),
            updated_at: Set(self.clock.now()),
            ..Default::default()
        };
        compare_and_set(&txn, gig_id, &[current.status], changes).await?;
        let gig = find_gig(&txn, gig_id).await?;
        txn.commit().await?;

        warn!(gig_id, from = ?current.status, "Gig disputed");
        Ok(gig)
    }

    /// Features a gig for `duration_days` (configured default when `None`).
    /// Requires a premium client; does not depend on the gig's status.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn feature(
        &self,
        gig_id: &str,
        actor: &Actor,
        duration_days: Option<u32>,
    ) -> Result<DateTime<Utc>> {
        actor.require_role(Role::Client)?;
        if !actor.is_premium {
            return Err(Error::forbidden(
                "Premium membership required to feature gigs",
            ));
        }
        let days = duration_days.unwrap_or(self.config.default_feature_days);
        if days == 0 {
            return Err(Error::validation("Feature duration must be at least one day"));
        }

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;
        ensure_owner(&current, actor, "feature")?;

        let now = self.clock.now();
        let featured_until = now + Duration::days(i64::from(days));
        Gig::update_many()
            .set(gig::ActiveModel {
                is_featured: Set(true),
                featured_until: Set(Some(featured_until)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(gig::Column::Id.eq(gig_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(gig_id, %featured_until, "Gig featured");
        Ok(featured_until)
    }

    /// Lists gigs matching `filter`, newest first.
    pub async fn list(&self, filter: &GigFilter) -> Result<Vec<gig::Model>> {
        if let (Some(min), Some(max)) = (filter.min_budget, filter.max_budget) {
            if min > max {
                return Err(Error::validation("minBudget cannot exceed maxBudget"));
            }
        }

        let mut query = Gig::find().order_by_desc(gig::Column::CreatedAt);
        if let Some(category) = &filter.category {
            query = query.filter(gig::Column::Category.eq(category.as_str()));
        }
        if let Some(level) = filter.experience_level {
            query = query.filter(gig::Column::ExperienceLevel.eq(level));
        }
        if let Some(status) = filter.status {
            query = query.filter(gig::Column::Status.eq(status));
        }

        let gigs: Vec<gig::Model> = query
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .filter(|g| filter.matches_in_memory(g))
            .collect();
        debug!("Listed {} gigs", gigs.len());
        Ok(gigs)
    }

    /// Fetches a gig with its milestones and applicants.
    pub async fn get(&self, gig_id: &str) -> Result<GigDetails> {
        let gig = find_gig(self.db.as_ref(), gig_id).await?;
        load_details(self.db.as_ref(), gig).await
    }

    /// Fetches a gig as `viewer` sees it. Applications are only shown to the
    /// owning client.
    pub async fn get_as(&self, gig_id: &str, viewer: Option<&Actor>) -> Result<GigDetails> {
        let mut details = self.get(gig_id).await?;
        if viewer.is_none_or(|actor| ensure_owner(&details.gig, actor, "view").is_err()) {
            details.applicants.clear();
        }
        Ok(details)
    }

    /// Ids of the gigs `client_id` has created and not deleted.
    pub async fn posted_gigs(&self, client_id: &str) -> Result<Vec<String>> {
        Ok(PostedGig::find()
            .filter(posted_gig::Column::ClientId.eq(client_id))
            .order_by_asc(posted_gig::Column::GigId)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|p| p.gig_id)
            .collect())
    }

    async fn owner_transition(
        &self,
        gig_id: &str,
        actor: &Actor,
        from: &[GigStatus],
        to: GigStatus,
    ) -> Result<gig::Model> {
        actor.require_role(Role::Client)?;

        let txn = self.db.begin().await?;
        let current = find_gig(&txn, gig_id).await?;
        ensure_owner(&current, actor, "change")?;
        if !from.contains(&current.status) {
            return Err(Error::invalid_state(format!(
                "Cannot move gig from {:?} to {:?}",
                current.status, to
            )));
        }

        let changes = gig::ActiveModel {
            status: Set(to),
            updated_at: Set(self.clock.now()),
            ..Default::default()
        };
        compare_and_set(&txn, gig_id, &[current.status], changes).await?;
        let gig = find_gig(&txn, gig_id).await?;
        txn.commit().await?;

        info!(gig_id, from = ?current.status, to = ?to, "Gig status changed");
        Ok(gig)
    }

    async fn insert_milestones<C: ConnectionTrait>(
        &self,
        conn: &C,
        gig_id: &str,
        inputs: &[NewMilestone],
    ) -> Result<Vec<milestone::Model>> {
        let mut created = Vec::with_capacity(inputs.len());
        for (position, input) in (0_i32..).zip(inputs) {
            let model = milestone::ActiveModel {
                id: Set(self.ids.next_id()),
                gig_id: Set(gig_id.to_string()),
                position: Set(position),
                title: Set(input.title.trim().to_string()),
                description: Set(input.description.trim().to_string()),
                amount: Set(input.amount),
                due_date: Set(input.due_date),
                status: Set(MilestoneStatus::Pending),
                submission_url: Set(None),
                submission_notes: Set(None),
                submitted_at: Set(None),
                feedback: Set(None),
                approved_at: Set(None),
            }
            .insert(conn)
            .await?;
            created.push(model);
        }
        Ok(created)
    }

    fn validate_budget(&self, budget: f64) -> Result<()> {
        if !budget.is_finite() || budget <= 0.0 {
            return Err(Error::InvalidAmount { amount: budget });
        }
        if budget < self.config.minimum_gig_budget {
            return Err(Error::validation(format!(
                "Minimum budget is {} {}",
                self.config.minimum_gig_budget, self.config.currency
            )));
        }
        Ok(())
    }

    fn validate_new_gig(&self, new_gig: &NewGig) -> Result<()> {
        required_text("title", &new_gig.title)?;
        required_text("description", &new_gig.description)?;
        required_text("category", &new_gig.category)?;
        self.validate_budget(new_gig.budget)?;
        validate_milestone_inputs(&new_gig.milestones)?;
        self.validator
            .validate(new_gig.milestones.iter().map(|m| m.amount), new_gig.budget)
            .into_result()?;
        Ok(())
    }
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("Missing required field: {field}")));
    }
    Ok(trimmed.to_string())
}

fn validate_milestone_inputs(milestones: &[NewMilestone]) -> Result<()> {
    if milestones.is_empty() {
        return Err(Error::validation("At least one milestone is required"));
    }
    for m in milestones {
        required_text("milestone title", &m.title)?;
        if !m.amount.is_finite() || m.amount <= 0.0 {
            return Err(Error::InvalidAmount { amount: m.amount });
        }
    }
    Ok(())
}

/// Loads a gig or fails with `NotFound`.
pub(crate) async fn find_gig<C: ConnectionTrait>(conn: &C, gig_id: &str) -> Result<gig::Model> {
    Gig::find_by_id(gig_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Gig",
            id: gig_id.to_string(),
        })
}

/// Fails with `Forbidden` unless `actor` owns `gig`.
pub(crate) fn ensure_owner(gig: &gig::Model, actor: &Actor, action: &str) -> Result<()> {
    if gig.client_id == actor.user_id {
        Ok(())
    } else {
        Err(Error::forbidden(format!("Unauthorized to {action} this gig")))
    }
}

/// Writes `changes` only if the gig is still in one of `expected`.
///
/// Zero matched rows means another writer moved the gig first.
pub(crate) async fn compare_and_set<C: ConnectionTrait>(
    conn: &C,
    gig_id: &str,
    expected: &[GigStatus],
    changes: gig::ActiveModel,
) -> Result<()> {
    let result = Gig::update_many()
        .set(changes)
        .filter(gig::Column::Id.eq(gig_id))
        .filter(gig::Column::Status.is_in(expected.iter().copied()))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        warn!(gig_id, ?expected, "Gig transition lost to a concurrent update");
        return Err(Error::conflict(format!(
            "Gig {gig_id} was modified concurrently"
        )));
    }
    Ok(())
}

pub(crate) async fn load_details<C: ConnectionTrait>(
    conn: &C,
    gig: gig::Model,
) -> Result<GigDetails> {
    let milestones = gig
        .find_related(Milestone)
        .order_by_asc(milestone::Column::Position)
        .all(conn)
        .await?;
    let applicants = gig
        .find_related(Applicant)
        .order_by_asc(applicant::Column::Position)
        .all(conn)
        .await?;
    Ok(GigDetails {
        gig,
        milestones,
        applicants,
    })
}
