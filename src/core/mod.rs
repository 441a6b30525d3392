//! Framework-agnostic marketplace logic.
//!
//! Pure rules (commission, milestone validation, chat filtering) have no store
//! access. The managers (`GigLifecycleManager`, `MilestoneEscrowEngine`,
//! `ChatService`) share one `Arc<DatabaseConnection>` and run every state change in a
//! single transaction.

pub mod applicant;
pub mod chat;
pub mod chat_filter;
pub mod clock;
pub mod commission;
pub mod escrow;
pub mod gig;
pub mod identity;
pub mod milestone_validator;

pub use applicant::{Assignment, NewApplication};
pub use chat::ChatService;
pub use commission::{CommissionCalculator, CommissionRecord};
pub use escrow::{ManualPayoutGateway, MilestoneEscrowEngine, PaymentGateway, Submission};
pub use gig::{GigDetails, GigFilter, GigLifecycleManager, GigPatch, NewGig, NewMilestone};
pub use identity::Actor;
