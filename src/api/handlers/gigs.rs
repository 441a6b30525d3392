//! Gig and application endpoints.

use crate::{
    api::{
        error::{json_body, optional_json_body, query_params},
        state::AppState,
    },
    core::{
        Actor, Assignment, GigDetails, GigFilter, GigPatch, NewApplication, NewGig,
    },
    entities::{ApplicantModel, GigModel},
    errors::Result,
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/gigs/{id}/accept-applicant`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AcceptRequest {
    /// Worker whose application is accepted
    pub student_id: String,
}

/// Body of `POST /api/gigs/{id}/feature`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureRequest {
    /// Falls back to the configured default
    #[serde(default)]
    pub duration_days: Option<u32>,
}

/// Result of featuring a gig.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureResponse {
    /// Featured gig
    pub gig_id: String,
    /// End of the featured window
    pub featured_until: DateTime<Utc>,
}

/// Gigs the caller has posted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedGigsResponse {
    /// Ids in creation order
    pub gig_ids: Vec<String>,
}

/// Creates a draft gig. Answers 201.
pub async fn create_gig(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<NewGig>, JsonRejection>,
) -> Result<(StatusCode, Json<GigDetails>)> {
    let new_gig = json_body(payload)?;
    let details = state.gigs.create(&actor, new_gig).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Public listing with optional filters.
pub async fn list_gigs(
    State(state): State<AppState>,
    query: std::result::Result<Query<GigFilter>, QueryRejection>,
) -> Result<Json<Vec<GigModel>>> {
    let filter = query_params(query)?;
    Ok(Json(state.gigs.list(&filter).await?))
}

/// Open to anonymous callers; applications are included for the owner only.
pub async fn get_gig(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    Path(gig_id): Path<String>,
) -> Result<Json<GigDetails>> {
    Ok(Json(state.gigs.get_as(&gig_id, viewer.as_ref()).await?))
}

/// Applies a partial update while the gig is editable.
pub async fn update_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
    payload: std::result::Result<Json<GigPatch>, JsonRejection>,
) -> Result<Json<GigDetails>> {
    let patch = json_body(payload)?;
    Ok(Json(state.gigs.update(&gig_id, &actor, patch).await?))
}

/// Deletes a draft or published gig. Answers 204.
pub async fn delete_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
) -> Result<StatusCode> {
    state.gigs.delete(&gig_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a draft to `published`.
pub async fn publish_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
) -> Result<Json<GigModel>> {
    Ok(Json(state.gigs.publish(&gig_id, &actor).await?))
}

/// Cancels a gig nobody has started on.
pub async fn cancel_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
) -> Result<Json<GigModel>> {
    Ok(Json(state.gigs.cancel(&gig_id, &actor).await?))
}

/// Flags a live gig as disputed.
pub async fn dispute_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
) -> Result<Json<GigModel>> {
    Ok(Json(state.gigs.dispute(&gig_id, &actor).await?))
}

/// Records the caller's application. Answers 201.
pub async fn apply_for_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
    payload: std::result::Result<Json<NewApplication>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicantModel>)> {
    let application = json_body(payload)?;
    let applicant = state
        .gigs
        .apply_for_gig(&gig_id, &actor, application)
        .await?;
    Ok((StatusCode::CREATED, Json(applicant)))
}

/// Assigns the gig to one applicant and opens the chat.
pub async fn accept_applicant(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
    payload: std::result::Result<Json<AcceptRequest>, JsonRejection>,
) -> Result<Json<Assignment>> {
    let request = json_body(payload)?;
    Ok(Json(
        state
            .gigs
            .accept_applicant(&gig_id, &actor, &request.student_id)
            .await?,
    ))
}

/// Applications on a gig, owner only.
pub async fn list_applicants(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
) -> Result<Json<Vec<ApplicantModel>>> {
    Ok(Json(state.gigs.list_applicants(&gig_id, &actor).await?))
}

/// The body is optional; without one the configured default duration applies.
pub async fn feature_gig(
    State(state): State<AppState>,
    actor: Actor,
    Path(gig_id): Path<String>,
    body: Bytes,
) -> Result<Json<FeatureResponse>> {
    let request: FeatureRequest = optional_json_body(&body)?;
    let featured_until = state
        .gigs
        .feature(&gig_id, &actor, request.duration_days)
        .await?;
    Ok(Json(FeatureResponse {
        gig_id,
        featured_until,
    }))
}

/// Ids of the caller's own gigs.
pub async fn posted_gigs(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<PostedGigsResponse>> {
    Ok(Json(PostedGigsResponse {
        gig_ids: state.gigs.posted_gigs(&actor.user_id).await?,
    }))
}
