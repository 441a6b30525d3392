//! Route table and server loop.

use super::handlers::{self, chats, gigs, milestones};
use super::state::AppState;
use crate::errors::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Every route, with request tracing.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/gigs", get(gigs::list_gigs).post(gigs::create_gig))
        .route(
            "/gigs/:id",
            get(gigs::get_gig)
                .put(gigs::update_gig)
                .delete(gigs::delete_gig),
        )
        .route("/gigs/:id/publish", post(gigs::publish_gig))
        .route("/gigs/:id/cancel", post(gigs::cancel_gig))
        .route("/gigs/:id/dispute", post(gigs::dispute_gig))
        .route("/gigs/:id/apply", post(gigs::apply_for_gig))
        .route("/gigs/:id/accept-applicant", post(gigs::accept_applicant))
        .route("/gigs/:id/applicants", get(gigs::list_applicants))
        .route("/gigs/:id/feature", post(gigs::feature_gig))
        .route("/me/gigs", get(gigs::posted_gigs))
        .route("/milestones/:id/submit", post(milestones::submit_milestone))
        .route("/milestones/:id/approve", post(milestones::approve_milestone))
        .route(
            "/milestones/:id/request-revision",
            post(milestones::request_revision),
        )
        .route("/earnings", get(milestones::platform_earnings))
        .route("/chats", get(chats::list_chats))
        .route(
            "/chats/:id/messages",
            get(chats::list_messages).post(chats::send_message),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves the API until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server ready and accepting connections");
    axum::serve(listener, build_router(state))
        .await
        .inspect_err(|e| error!(%addr, "HTTP server terminated unexpectedly: {e}"))?;
    Ok(())
}
