//! HTTP surface over the marketplace core.
//!
//! Every route except `GET /health` and the public gig reads needs the
//! identity headers described in [`auth`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::{build_router, serve};
pub use state::AppState;
