//! Caller identity from proxy-set headers.
//!
//! Authentication is done upstream. The proxy forwards the verified user as
//! `x-user-id`, `x-user-role` and, optionally, `x-user-premium`.

use crate::{core::identity::Actor, entities::Role, errors::Error};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Verified user id
pub const USER_ID_HEADER: &str = "x-user-id";
/// `client` or `student`
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// `true` for premium members; absent means standard
pub const USER_PREMIUM_HEADER: &str = "x-user-premium";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn unauthenticated(message: impl Into<String>) -> Error {
    Error::Unauthenticated {
        message: message.into(),
    }
}

/// Builds an [`Actor`] from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Error> {
    let user_id = header(headers, USER_ID_HEADER)
        .ok_or_else(|| unauthenticated("Missing user id"))?;
    let role = header(headers, USER_ROLE_HEADER)
        .ok_or_else(|| unauthenticated("Missing user role"))?
        .parse::<Role>()
        .map_err(unauthenticated)?;
    let is_premium = match header(headers, USER_PREMIUM_HEADER) {
        None => false,
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
        Some(other) => return Err(unauthenticated(format!("Invalid premium flag '{other}'"))),
    };

    Ok(Actor {
        user_id: user_id.to_string(),
        role,
        is_premium,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}
