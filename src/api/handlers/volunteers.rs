//! Password hashing for volunteer accounts.
//!
//! `create` only rejects a missing or empty password. `update-password` also
//! enforces a minimum length. Existing volunteers may hold short passwords
//! set through `create`, so the two checks stay separate.

use axum::{body::Bytes, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task;
use tracing::error;
use utoipa::ToSchema;

use super::{parse_body, ApiError, ErrorBody};
use crate::password::{hash_password, MIN_UPDATE_LENGTH};

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PasswordRequest {
    /// Any JSON value is accepted here so a non-string is reported as
    /// `password_required` rather than a shape error.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password: Option<Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HashedPasswordResponse {
    pub success: bool,
    pub hashed_password: String,
}

fn required_password(request: &PasswordRequest) -> Result<&str, ApiError> {
    match &request.password {
        Some(Value::String(password)) if !password.is_empty() => Ok(password),
        _ => Err(ApiError::validation("password_required")),
    }
}

async fn hash(password: String) -> Result<Json<HashedPasswordResponse>, ApiError> {
    let hashed = task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| {
            error!("password hashing task failed: {err}");
            ApiError::Internal
        })?
        .map_err(|err| {
            error!("password hashing failed: {err}");
            ApiError::Internal
        })?;
    Ok(Json(HashedPasswordResponse {
        success: true,
        hashed_password: hashed,
    }))
}

#[utoipa::path(
    post,
    path = "/api/volunteers/create",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Password hashed", body = HashedPasswordResponse),
        (status = 400, description = "Password missing or empty", body = ErrorBody),
        (status = 500, description = "Hashing failed", body = ErrorBody)
    ),
    tag = "volunteers"
)]
pub async fn create(body: Bytes) -> Result<Json<HashedPasswordResponse>, ApiError> {
    let request: PasswordRequest = parse_body(&body)?;
    let password = required_password(&request)?;
    hash(password.to_string()).await
}

#[utoipa::path(
    post,
    path = "/api/volunteers/update-password",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Password hashed", body = HashedPasswordResponse),
        (status = 400, description = "Password missing, empty or too short", body = ErrorBody),
        (status = 500, description = "Hashing failed", body = ErrorBody)
    ),
    tag = "volunteers"
)]
pub async fn update_password(body: Bytes) -> Result<Json<HashedPasswordResponse>, ApiError> {
    let request: PasswordRequest = parse_body(&body)?;
    let password = required_password(&request)?;
    if password.chars().count() < MIN_UPDATE_LENGTH {
        return Err(ApiError::Validation {
            code: "password_too_short",
            message: Some(format!(
                "password must be at least {MIN_UPDATE_LENGTH} characters"
            )),
        });
    }
    hash(password.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::{verify_password, ALGORITHM_TAG};
    use anyhow::Result;

    fn expect_code(result: Result<Json<HashedPasswordResponse>, ApiError>, expected: &str) {
        match result {
            Err(ApiError::Validation { code, .. }) => assert_eq!(code, expected),
            other => panic!("expected {expected}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_accepts_short_password() -> Result<()> {
        let Json(response) = create(Bytes::from_static(br#"{"password":"abcde"}"#)).await?;
        assert!(response.success);
        assert!(response
            .hashed_password
            .starts_with(&format!("{ALGORITHM_TAG}$")));
        assert!(verify_password("abcde", &response.hashed_password)?);
        Ok(())
    }

    #[tokio::test]
    async fn update_rejects_short_password_with_distinct_code() {
        expect_code(
            update_password(Bytes::from_static(br#"{"password":"abcde"}"#)).await,
            "password_too_short",
        );
        expect_code(
            update_password(Bytes::from_static(br#"{"password":""}"#)).await,
            "password_required",
        );
    }

    #[tokio::test]
    async fn non_string_password_is_required_error() {
        expect_code(
            create(Bytes::from_static(br#"{"password":123456}"#)).await,
            "password_required",
        );
        expect_code(create(Bytes::new()).await, "password_required");
    }

    #[tokio::test]
    async fn response_never_echoes_plaintext() -> Result<()> {
        let Json(response) =
            update_password(Bytes::from_static(br#"{"password":"s3cret-pass"}"#)).await?;
        assert!(!serde_json::to_string(&response)?.contains("s3cret-pass"));
        Ok(())
    }
}
