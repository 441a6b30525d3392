//! Shared test utilities for the marketplace core.
//!
//! This module provides an in-memory database, deterministic time and ids,
//! fully wired managers, and fixture builders with sensible defaults.

use crate::{
    config::MarketplaceConfig,
    core::{
        ChatService, GigLifecycleManager, ManualPayoutGateway, MilestoneEscrowEngine,
        NewApplication, NewGig, NewMilestone, PaymentGateway,
        clock::{Clock, IdGenerator},
        identity::Actor,
    },
    entities::{ExperienceLevel, gig},
    errors::Result,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map_or_else(|poisoned| *poisoned.into_inner(), |now| *now)
    }
}

/// Ids of the form `<prefix>-<n>`, counting from 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Creates a generator whose ids start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(Arc::new(db))
}

/// Instant every test clock starts at.
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A gig manager over `db` with default configuration.
/// Use with `MockDatabase` for paths that must fail before any query.
pub fn manager_over(db: DatabaseConnection) -> GigLifecycleManager {
    GigLifecycleManager::new(
        Arc::new(db),
        Arc::new(MarketplaceConfig::default()),
        Arc::new(ManualClock::new(test_start())),
        Arc::new(SequentialIds::new("id")),
    )
}

/// A milestone due two weeks after [`test_start`].
pub fn sample_milestone(title: &str, amount: f64) -> NewMilestone {
    NewMilestone {
        title: title.to_string(),
        description: format!("{title} deliverable"),
        amount,
        due_date: test_start() + Duration::days(14),
    }
}

/// A gig with one milestone per entry of `amounts`.
///
/// # Defaults
/// * title: "Landing page"
/// * category: "Web Development"
/// * experience level: beginner
pub fn sample_new_gig(budget: f64, amounts: &[f64]) -> NewGig {
    NewGig {
        title: "Landing page".to_string(),
        description: "Responsive landing page for a bakery".to_string(),
        category: "Web Development".to_string(),
        budget,
        deadline: test_start() + Duration::days(30),
        skills_required: vec!["html".to_string(), "css".to_string()],
        experience_level: ExperienceLevel::Beginner,
        milestones: amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| sample_milestone(&format!("Milestone {}", i + 1), *amount))
            .collect(),
    }
}

/// An application with a fixed cover letter.
pub fn application(proposed_budget: Option<f64>) -> NewApplication {
    NewApplication {
        cover_letter: "I have shipped a dozen of these.".to_string(),
        proposed_budget,
    }
}

/// Everything a core test needs, sharing one in-memory database.
pub struct TestEnv {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<ManualClock>,
    pub ids: Arc<SequentialIds>,
    pub config: Arc<MarketplaceConfig>,
    pub gigs: GigLifecycleManager,
    pub escrow: MilestoneEscrowEngine,
    pub chats: ChatService,
}

impl TestEnv {
    /// Default configuration and a confirming manual gateway.
    pub async fn new() -> Result<Self> {
        Self::build(MarketplaceConfig::default(), None).await
    }

    /// Custom configuration.
    pub async fn with_config(config: MarketplaceConfig) -> Result<Self> {
        Self::build(config, None).await
    }

    /// Custom payment gateway.
    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Result<Self> {
        Self::build(MarketplaceConfig::default(), Some(gateway)).await
    }

    async fn build(
        config: MarketplaceConfig,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Result<Self> {
        let db = setup_test_db().await?;
        let clock = Arc::new(ManualClock::new(test_start()));
        let ids = Arc::new(SequentialIds::new("id"));
        let config = Arc::new(config);
        let gateway: Arc<dyn PaymentGateway> = match gateway {
            Some(gateway) => gateway,
            None => Arc::new(ManualPayoutGateway::new(Arc::new(SequentialIds::new("ref")))),
        };

        let gigs = GigLifecycleManager::new(
            Arc::clone(&db),
            config.clone(),
            clock.clone(),
            ids.clone(),
        );
        let escrow = MilestoneEscrowEngine::new(
            Arc::clone(&db),
            &config,
            gateway,
            clock.clone(),
            ids.clone(),
        )?;
        let chats = ChatService::new(Arc::clone(&db), clock.clone(), ids.clone());

        Ok(Self {
            db,
            clock,
            ids,
            config,
            gigs,
            escrow,
            chats,
        })
    }

    /// A draft gig with budget 1000 split 400/600.
    pub async fn draft_gig(&self, client: &Actor) -> Result<gig::Model> {
        Ok(self
            .gigs
            .create(client, sample_new_gig(1000.0, &[400.0, 600.0]))
            .await?
            .gig)
    }

    /// A draft gig that has been published.
    pub async fn published_gig(&self, client: &Actor) -> Result<gig::Model> {
        let draft = self.draft_gig(client).await?;
        self.gigs.publish(&draft.id, client).await
    }

    /// A published gig with `worker_id` applied and accepted.
    pub async fn assigned_gig(&self, client: &Actor, worker_id: &str) -> Result<gig::Model> {
        let published = self.published_gig(client).await?;
        self.gigs
            .apply_for_gig(&published.id, &Actor::student(worker_id), application(None))
            .await?;
        Ok(self
            .gigs
            .accept_applicant(&published.id, client, worker_id)
            .await?
            .gig)
    }
}

#[test]
fn test_manual_clock_advances() {
    let clock = ManualClock::new(test_start());
    assert_eq!(clock.now(), test_start());
    clock.advance(Duration::days(7));
    assert_eq!(clock.now(), test_start() + Duration::days(7));
}

#[test]
fn test_sequential_ids_are_unique() {
    let ids = SequentialIds::new("gig");
    assert_eq!(ids.next_id(), "gig-1");
    assert_eq!(ids.next_id(), "gig-2");
}
