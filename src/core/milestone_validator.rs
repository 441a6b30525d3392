//! Milestone breakdown validation against a gig budget.

use super::commission::round2;
use crate::errors::{Error, Result};
use serde::Serialize;

/// Outcome of validating a milestone breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneValidation {
    /// Whether the total lies within the allowed band
    pub valid: bool,
    /// Sum of milestone amounts, rounded to two decimals
    pub total_amount: f64,
    /// Why the breakdown was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MilestoneValidation {
    /// Converts an invalid outcome into [`Error::Validation`].
    pub fn into_result(self) -> Result<f64> {
        if self.valid {
            Ok(self.total_amount)
        } else {
            Err(Error::validation(self.message.unwrap_or_default()))
        }
    }
}

/// Accepts a breakdown whose total lies in `[0.9 * budget, budget]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneValidator;

impl MilestoneValidator {
    /// Smallest fraction of the budget the milestones must cover.
    pub const MIN_COVERAGE: f64 = 0.9;

    /// Validates milestone amounts against `budget`.
    #[must_use]
    pub fn validate<I>(&self, amounts: I, budget: f64) -> MilestoneValidation
    where
        I: IntoIterator<Item = f64>,
    {
        let total_amount = round2(amounts.into_iter().sum());

        if total_amount > budget {
            return MilestoneValidation {
                valid: false,
                total_amount,
                message: Some("Total milestone amount exceeds gig budget".to_string()),
            };
        }

        if total_amount < round2(budget * Self::MIN_COVERAGE) {
            return MilestoneValidation {
                valid: false,
                total_amount,
                message: Some(
                    "Total milestone amount must reach at least 90% of gig budget".to_string(),
                ),
            };
        }

        MilestoneValidation {
            valid: true,
            total_amount,
            message: None,
        }
    }
}
