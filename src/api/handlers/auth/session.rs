//! Login, session lookup, logout and logout-all.

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{cookies::extract_session_tokens, principal::authenticate, state::AuthState};
use crate::{
    api::handlers::{non_empty, parse_body, ApiError, ErrorBody, SuccessBody},
    upstream::{HostIdentity, RevokeScope, UpstreamError},
};

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookies set", body = SuccessBody),
        (status = 400, description = "Missing or malformed identity token", body = ErrorBody),
        (status = 500, description = "Session could not be created", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    auth: Extension<Arc<AuthState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let Some(id_token) = non_empty(request.id_token.as_deref()) else {
        return Err(ApiError::missing_fields());
    };

    let tokens = match auth.functions().create_session(id_token).await {
        Ok(tokens) => tokens,
        Err(UpstreamError::Status { status, body }) => {
            error!(%status, body = %body, "session creation rejected");
            return Err(ApiError::Upstream {
                status,
                code: "login_failed",
                message: None,
            });
        }
        Err(err) => {
            error!("session creation failed: {err}");
            return Err(ApiError::Internal);
        }
    };

    let config = auth.config();
    let headers = config
        .cookie_profile()
        .session_headers(&tokens, config.session_max_age_seconds())
        .map_err(|err| {
            error!("failed to build session cookies: {err}");
            ApiError::Internal
        })?;

    info!("host signed in");
    Ok((StatusCode::OK, headers, Json(SuccessBody::OK)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session is active", body = HostIdentity),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
) -> Result<Json<HostIdentity>, ApiError> {
    authenticate(&headers, &auth).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session revoked and cookies cleared", body = SuccessBody),
        (status = 500, description = "Revocation failed; cookies are still cleared", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth: Extension<Arc<AuthState>>) -> Response {
    end_session(&headers, &auth, RevokeScope::ThisDevice).await
}

#[utoipa::path(
    post,
    path = "/api/logout-all",
    responses(
        (status = 200, description = "All sessions revoked and cookies cleared", body = SuccessBody),
        (status = 500, description = "Revocation failed; cookies are still cleared", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout_all(headers: HeaderMap, auth: Extension<Arc<AuthState>>) -> Response {
    end_session(&headers, &auth, RevokeScope::AllDevices).await
}

/// Revoke the caller's session upstream. Every response, success or not,
/// carries both clearing cookies.
async fn end_session(headers: &HeaderMap, auth: &AuthState, scope: RevokeScope) -> Response {
    let clear = auth.config().cookie_profile().clear_headers();

    let Some(tokens) = extract_session_tokens(headers) else {
        return (StatusCode::OK, clear, Json(SuccessBody::OK)).into_response();
    };

    match auth.functions().revoke_session(&tokens, scope).await {
        Ok(()) => {
            info!(?scope, "host signed out");
            (StatusCode::OK, clear, Json(SuccessBody::OK)).into_response()
        }
        Err(UpstreamError::Status { status, body }) => {
            error!(%status, body = %body, ?scope, "session revocation rejected");
            (status, clear, Json(ErrorBody::new("logout_failed"))).into_response()
        }
        Err(err) => {
            error!(?scope, "session revocation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                clear,
                Json(ErrorBody::new("internal_error")),
            )
                .into_response()
        }
    }
}
