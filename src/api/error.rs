//! Error to HTTP response mapping.
//!
//! Bodies are `{"error":{"kind":"<kind>","message":"<text>"}}`. Store, I/O
//! and gateway failures are logged here and answered with a generic message.

use crate::errors::{Error, ErrorKind, Result};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::error;

impl ErrorKind {
    /// HTTP status for this category.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Authz => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StateConflict => StatusCode::CONFLICT,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    /// Message safe to show to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "Storage unavailable".to_string(),
            Self::PaymentGateway { .. } => "Payment release failed".to_string(),
            Self::Config { .. } | Self::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if matches!(kind, ErrorKind::Upstream | ErrorKind::Internal) {
            error!("Request failed: {self}");
        }
        let body = json!({
            "error": {
                "kind": kind,
                "message": self.public_message(),
            }
        });
        (kind.status_code(), Json(body)).into_response()
    }
}

/// Unwraps a JSON body, turning a malformed or unknown shape into a
/// validation error.
pub fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

/// Parses a body that may be omitted. An empty body gives `T::default()`;
/// anything else must be a well-formed `T`.
pub fn optional_json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("Failed to parse the request body: {e}")))
}

/// Unwraps query parameters the same way as [`json_body`].
pub fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::body::to_bytes;
    use sea_orm::DbErr;

    async fn body_of(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_codes_follow_kind() {
        let cases = [
            (Error::validation("bad"), StatusCode::BAD_REQUEST),
            (Error::MessageBlocked, StatusCode::BAD_REQUEST),
            (
                Error::Unauthenticated {
                    message: "no id".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (Error::forbidden("not yours"), StatusCode::FORBIDDEN),
            (
                Error::NotFound {
                    entity: "Gig",
                    id: "g-1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (Error::conflict("lost"), StatusCode::CONFLICT),
            (Error::invalid_state("draft"), StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_body_carries_kind_and_message() {
        let (status, body) = body_of(Error::invalid_state("Gig is already published")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "state_conflict");
        assert_eq!(
            body["error"]["message"],
            "Invalid state: Gig is already published"
        );
    }

    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Note {
        text: Option<String>,
    }

    #[test]
    fn test_optional_body_defaults_only_when_empty() {
        let empty: Note = optional_json_body(&Bytes::new()).unwrap();
        assert!(empty.text.is_none());
        let blank: Note = optional_json_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(blank.text.is_none());

        let given: Note = optional_json_body(&Bytes::from_static(br#"{"text":"hi"}"#)).unwrap();
        assert_eq!(given.text.as_deref(), Some("hi"));

        for bad in [&br#"{"txet":"hi"}"#[..], &b"{not json"[..], &b"[]"[..]] {
            let err = optional_json_body::<Note>(&Bytes::copy_from_slice(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_store_errors_do_not_leak() {
        let (status, body) =
            body_of(Error::Database(DbErr::Custom("near \"gigs\": syntax error".to_string()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["kind"], "upstream");
        assert_eq!(body["error"]["message"], "Storage unavailable");
    }
}
