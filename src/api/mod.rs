use crate::{email::EmailSender, store::SharedStore};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;
pub mod pages;

use handlers::{
    auth::{self, gate, register, session},
    health, payments, support, volunteers,
};

pub use auth::{AuthConfig, AuthState, CookieProfile};
pub use openapi::openapi;
pub use support::SupportConfig;

/// Long-lived handles shared by every request.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthState>,
    pub store: SharedStore,
    pub email: Arc<dyn EmailSender>,
    pub support: Arc<SupportConfig>,
}

/// Build the full application: pages, API routes, docs, the session gate and
/// request tracing.
#[must_use]
pub fn app(services: Services) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/login", post(session::login))
        .route("/api/session", get(session::session))
        .route("/api/logout", post(session::logout))
        .route("/api/logout-all", post(session::logout_all))
        .route("/api/register-host", post(register::register_host))
        .route("/api/volunteers/create", post(volunteers::create))
        .route(
            "/api/volunteers/update-password",
            post(volunteers::update_password),
        )
        .route("/api/payments", get(payments::payment_record))
        .route(
            "/api/payments/bank-details",
            post(payments::save_bank_details),
        )
        .route(
            "/api/owner/toggle-payout-kyc",
            post(payments::toggle_payout_kyc),
        )
        .route(
            "/api/support/tickets",
            post(support::create_ticket).get(support::list_tickets),
        )
        .route("/api/support/tickets/:ticket_id", get(support::get_ticket))
        .route(
            "/api/support/tickets/:ticket_id/messages",
            post(support::add_message),
        )
        .route(
            "/api/support/tickets/:ticket_id/status",
            post(support::update_status),
        )
        .route("/api/support/notify", post(support::notify))
        .merge(pages::router())
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi()))
        .layer(middleware::from_fn_with_state(
            services.auth.clone(),
            gate::session_gate,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(services.auth))
                .layer(Extension(services.store))
                .layer(Extension(services.email))
                .layer(Extension(services.support)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, services: Services) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app(services).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
