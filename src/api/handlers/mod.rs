pub mod auth;
pub mod health;
pub mod payments;
pub mod support;
pub mod volunteers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

/// Error envelope returned by every API route.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            error: code.to_string(),
            message: None,
            upstream_status: None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub const OK: Self = Self { success: true };
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body does not match the expected shape")]
    InvalidPayload,

    #[error("validation failed: {code}")]
    Validation {
        code: &'static str,
        message: Option<String>,
    },

    #[error("missing or invalid session")]
    Unauthorized,

    #[error("caller is not allowed to perform this action")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("upstream returned {status}")]
    Upstream {
        status: StatusCode,
        code: &'static str,
        message: Option<String>,
    },

    #[error("dependency failed: {code}")]
    BadGateway { code: &'static str },

    #[error("internal error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn validation(code: &'static str) -> Self {
        Self::Validation {
            code,
            message: None,
        }
    }

    #[must_use]
    pub fn missing_fields() -> Self {
        Self::validation("missing_fields")
    }

    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            Self::InvalidPayload => (StatusCode::BAD_REQUEST, ErrorBody::new("invalid_payload")),
            Self::Validation { code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    ..ErrorBody::new(code)
                },
            ),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorBody::new("unauthorized")),
            Self::Forbidden => (StatusCode::FORBIDDEN, ErrorBody::new("forbidden")),
            Self::NotFound => (StatusCode::NOT_FOUND, ErrorBody::new("not_found")),
            Self::Upstream {
                status,
                code,
                message,
            } => (
                *status,
                ErrorBody {
                    message: message.clone(),
                    upstream_status: Some(status.as_u16()),
                    ..ErrorBody::new(code)
                },
            ),
            Self::BadGateway { code } => (StatusCode::BAD_GATEWAY, ErrorBody::new(code)),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("internal_error"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

/// Parse a JSON request body into `T`.
///
/// A body that is not JSON at all (including an empty body) is read as `{}`
/// so field checks still run. Valid JSON of the wrong shape, such as unknown
/// fields or wrong types, is `invalid_payload`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value = serde_json::from_slice::<Value>(body).unwrap_or_else(|_| Value::Object(Map::new()));
    serde_json::from_value(value).map_err(|err| {
        debug!("rejected request body: {err}");
        ApiError::InvalidPayload
    })
}

/// Trimmed, non-empty string or `None`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[derive(Deserialize, Debug, Default)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn parse_body_treats_garbage_as_empty_object() -> Result<()> {
        let payload: Payload = parse_body(b"not json")?;
        assert!(payload.name.is_none());
        let payload: Payload = parse_body(b"")?;
        assert!(payload.name.is_none());
        Ok(())
    }

    #[test]
    fn parse_body_rejects_unknown_fields() {
        let result: Result<Payload, ApiError> = parse_body(br#"{"name":"a","extra":1}"#);
        assert!(matches!(result, Err(ApiError::InvalidPayload)));
    }

    #[test]
    fn parse_body_rejects_wrong_types() {
        let result: Result<Payload, ApiError> = parse_body(br#"{"name":42}"#);
        assert!(matches!(result, Err(ApiError::InvalidPayload)));
    }

    #[test]
    fn upstream_error_keeps_status_and_message() {
        let error = ApiError::Upstream {
            status: StatusCode::CONFLICT,
            code: "registration_failed",
            message: Some("already registered".to_string()),
        };
        let (status, body) = error.status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "registration_failed");
        assert_eq!(body.message.as_deref(), Some("already registered"));
        assert_eq!(body.upstream_status, Some(409));
    }

    #[test]
    fn internal_error_is_generic() {
        let (status, body) = ApiError::Internal.status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, ErrorBody::new("internal_error"));
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty(Some("  a ")), Some("a"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
