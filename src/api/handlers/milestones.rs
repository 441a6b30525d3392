//! Milestone review endpoints.

use crate::{
    api::{
        error::{json_body, optional_json_body},
        state::AppState,
    },
    core::{Actor, Submission, escrow::Approval},
    entities::MilestoneModel,
    errors::Result,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

/// Optional body of `POST /api/milestones/{id}/approve`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApproveRequest {
    /// Note for the worker
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Body of `POST /api/milestones/{id}/request-revision`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RevisionRequest {
    /// What needs to change; required
    pub feedback: String,
}

/// Platform commission collected so far.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsResponse {
    /// Sum of every recorded commission
    pub platform_earnings: f64,
}

/// Records the worker's delivery.
pub async fn submit_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Path(milestone_id): Path<String>,
    payload: std::result::Result<Json<Submission>, JsonRejection>,
) -> Result<Json<MilestoneModel>> {
    let submission = json_body(payload)?;
    Ok(Json(
        state
            .escrow
            .submit(&milestone_id, &actor, submission)
            .await?,
    ))
}

/// Feedback is optional, so the body may be omitted. A body that is present
/// must parse.
pub async fn approve_milestone(
    State(state): State<AppState>,
    actor: Actor,
    Path(milestone_id): Path<String>,
    body: Bytes,
) -> Result<Json<Approval>> {
    let request: ApproveRequest = optional_json_body(&body)?;
    Ok(Json(
        state
            .escrow
            .approve(&milestone_id, &actor, request.feedback)
            .await?,
    ))
}

/// Sends a submission back to the worker.
pub async fn request_revision(
    State(state): State<AppState>,
    actor: Actor,
    Path(milestone_id): Path<String>,
    payload: std::result::Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<MilestoneModel>> {
    let request = json_body(payload)?;
    Ok(Json(
        state
            .escrow
            .request_revision(&milestone_id, &actor, &request.feedback)
            .await?,
    ))
}

/// Total commission across all payouts.
pub async fn platform_earnings(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<EarningsResponse>> {
    Ok(Json(EarningsResponse {
        platform_earnings: state.escrow.platform_earnings().await?,
    }))
}
