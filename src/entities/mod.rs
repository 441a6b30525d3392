//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod applicant;
pub mod chat;
pub mod chat_message;
pub mod enums;
pub mod gig;
pub mod milestone;
pub mod payout;
pub mod posted_gig;

// Re-export specific types to avoid conflicts
pub use applicant::{
    Column as ApplicantColumn, Entity as Applicant, Model as ApplicantModel,
};
pub use chat::{Column as ChatColumn, Entity as Chat, Model as ChatModel};
pub use chat_message::{
    Column as ChatMessageColumn, Entity as ChatMessage, Model as ChatMessageModel,
};
pub use enums::{ApplicantStatus, ExperienceLevel, GigStatus, MilestoneStatus, Role};
pub use gig::{Column as GigColumn, Entity as Gig, Model as GigModel, SkillSet};
pub use milestone::{Column as MilestoneColumn, Entity as Milestone, Model as MilestoneModel};
pub use payout::{Column as PayoutColumn, Entity as Payout, Model as PayoutModel};
pub use posted_gig::{Column as PostedGigColumn, Entity as PostedGig, Model as PostedGigModel};
