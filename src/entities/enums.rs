//! Active enums shared by the entity definitions.
//!
//! Each status column is stored as text and surfaces in Rust as a closed enum,
//! so an unknown status string can never enter the core.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle status of a gig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GigStatus {
    /// Created, visible only to its owner
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for applications
    #[sea_orm(string_value = "published")]
    Published,
    /// A worker has been accepted
    #[sea_orm(string_value = "assigned")]
    Assigned,
    /// At least one milestone has been submitted
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Every milestone approved and paid out
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Withdrawn by the client before assignment
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Escalated to the external dispute process
    #[sea_orm(string_value = "disputed")]
    Disputed,
}

impl GigStatus {
    /// Terminal statuses admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Disputed)
    }

    /// Gig fields may only be edited while the gig is not yet assigned.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Published)
    }
}

/// Experience level a gig asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[default]
    #[sea_orm(string_value = "beginner")]
    Beginner,
    #[sea_orm(string_value = "intermediate")]
    Intermediate,
    #[sea_orm(string_value = "advanced")]
    Advanced,
}

/// Review status of a single milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not yet submitted
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Awaiting client review
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Accepted and paid out
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Sent back to the worker for another submission
    #[sea_orm(string_value = "revision_requested")]
    RevisionRequested,
}

/// Status of a worker's application to a gig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Posts gigs and pays for them
    #[sea_orm(string_value = "client")]
    Client,
    /// Applies to gigs and delivers milestones
    #[sea_orm(string_value = "student")]
    Student,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "student" => Ok(Self::Student),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Student => f.write_str("student"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(GigStatus::Completed.is_terminal());
        assert!(GigStatus::Cancelled.is_terminal());
        assert!(GigStatus::Disputed.is_terminal());
        assert!(!GigStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Client".parse::<Role>(), Ok(Role::Client));
        assert_eq!(" student ".parse::<Role>(), Ok(Role::Student));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&MilestoneStatus::RevisionRequested).unwrap_or_default();
        assert_eq!(json, "\"revision_requested\"");
    }
}
