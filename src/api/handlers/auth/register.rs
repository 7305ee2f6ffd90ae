//! Host registration, forwarded to the registration cloud function.

use axum::{body::Bytes, extract::Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use super::state::AuthState;
use crate::{
    api::handlers::{non_empty, parse_body, ApiError, ErrorBody},
    upstream::UpstreamError,
};

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterHostRequest {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Body sent upstream. A missing phone is sent as an explicit `null`.
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct RegisterHostPayload<'a> {
    id_token: &'a str,
    name: &'a str,
    phone: Option<&'a str>,
}

impl RegisterHostRequest {
    fn payload(&self) -> Result<RegisterHostPayload<'_>, ApiError> {
        let (Some(id_token), Some(name)) = (
            non_empty(self.id_token.as_deref()),
            non_empty(self.name.as_deref()),
        ) else {
            return Err(ApiError::missing_fields());
        };
        Ok(RegisterHostPayload {
            id_token,
            name,
            phone: non_empty(self.phone.as_deref()),
        })
    }
}

#[utoipa::path(
    post,
    path = "/api/register-host",
    request_body = RegisterHostRequest,
    responses(
        (status = 200, description = "Upstream registration response, relayed as-is"),
        (status = 400, description = "Missing identity token or name", body = ErrorBody),
        (status = 500, description = "Registration request failed", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_host(
    auth: Extension<Arc<AuthState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: RegisterHostRequest = parse_body(&body)?;
    let payload = request.payload()?;

    match auth.functions().register_host(&payload).await {
        Ok(value) => {
            info!("host registered");
            Ok(Json(value))
        }
        Err(UpstreamError::Status { status, body }) => {
            error!(%status, "host registration rejected");
            Err(ApiError::Upstream {
                status,
                code: "registration_failed",
                message: Some(body),
            })
        }
        Err(err) => {
            error!("host registration failed: {err}");
            Err(ApiError::Internal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn payload_normalizes_missing_phone_to_null() -> Result<()> {
        let request: RegisterHostRequest =
            parse_body(br#"{"idToken":"tok","name":" Ada ","phone":"  "}"#)?;
        let payload = request.payload()?;
        assert_eq!(
            serde_json::to_value(&payload)?,
            json!({ "idToken": "tok", "name": "Ada", "phone": null })
        );
        Ok(())
    }

    #[test]
    fn payload_requires_token_and_name() -> Result<()> {
        let request: RegisterHostRequest = parse_body(br#"{"name":"Ada"}"#)?;
        assert!(matches!(
            request.payload(),
            Err(ApiError::Validation {
                code: "missing_fields",
                ..
            })
        ));
        Ok(())
    }
}
