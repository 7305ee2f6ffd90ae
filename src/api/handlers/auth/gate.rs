//! Session gate applied in front of every route.
//!
//! Public paths pass through untouched. Everything else needs both session
//! cookies and a successful verification; any failure redirects to the login
//! page. The gate never alters the request it forwards.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{cookies::extract_session_tokens, state::AuthState};

pub const LOGIN_PATH: &str = "/login";

const PUBLIC_PREFIXES: [&str; 6] = [
    "/login",
    "/register",
    "/api",
    "/assets",
    "/favicon.ico",
    "/health",
];

/// True when `path` is a public prefix or lies beneath one (`/api/x`, not `/apix`).
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

pub(crate) async fn session_gate(
    State(auth): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(tokens) = extract_session_tokens(request.headers()) else {
        debug!("no session cookies, redirecting to login");
        return redirect_to_login();
    };

    match auth.functions().verify_session(&tokens).await {
        Ok(identity) => {
            debug!(uid = %identity.uid, "session verified");
            next.run(request).await
        }
        Err(err) => {
            warn!("session verification failed: {err}");
            redirect_to_login()
        }
    }
}

fn redirect_to_login() -> Response {
    Redirect::temporary(LOGIN_PATH).into_response()
}
