use axum::http::HeaderMap;
use tracing::warn;

use super::{cookies::extract_session_tokens, state::AuthState};
use crate::{api::handlers::ApiError, upstream::HostIdentity};

/// Resolve the caller's session cookies into a verified identity.
///
/// A verifier outage is treated the same as a rejected session.
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    auth: &AuthState,
) -> Result<HostIdentity, ApiError> {
    let Some(tokens) = extract_session_tokens(headers) else {
        return Err(ApiError::Unauthorized);
    };
    auth.functions()
        .verify_session(&tokens)
        .await
        .map_err(|err| {
            warn!("session verification failed: {err}");
            ApiError::Unauthorized
        })
}

/// Like [`authenticate`], then require an owner email.
pub(crate) async fn require_owner(
    headers: &HeaderMap,
    auth: &AuthState,
) -> Result<HostIdentity, ApiError> {
    let identity = authenticate(headers, auth).await?;
    if auth.config().is_owner(&identity) {
        Ok(identity)
    } else {
        warn!(uid = %identity.uid, "owner operation denied");
        Err(ApiError::Forbidden)
    }
}
