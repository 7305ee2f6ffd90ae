use crate::{
    api::{self, AuthConfig, AuthState, CookieProfile, Services, SupportConfig},
    cli::{commands::store, telemetry},
    email::{EmailSender, HttpEmailSender, LogEmailSender},
    store::{FirestoreConfig, FirestoreStore, MemoryStore, SharedStore},
    upstream::{CloudFunctions, Endpoints},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub endpoints: Endpoints,
    pub cookie_domain: Option<String>,
    pub production: bool,
    pub session_max_age_seconds: i64,
    pub owner_emails: Vec<String>,
    pub store: store::Options,
    pub email_api_key: Option<SecretString>,
    pub email_api_url: String,
    pub email_from: String,
    pub support_email: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a client cannot be built, the cookie domain is invalid,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let cookie_profile = CookieProfile::new(args.production, args.cookie_domain)
        .context("Invalid cookie configuration")?;
    if !args.production {
        warn!("Production mode is off: session cookies are not marked Secure");
    }

    let auth_config = AuthConfig::new(cookie_profile)
        .with_session_max_age_seconds(args.session_max_age_seconds)
        .with_owner_emails(args.owner_emails);
    let functions =
        CloudFunctions::new(args.endpoints).context("Failed to build cloud functions client")?;

    let store: SharedStore = match args.store {
        store::Options::Memory => {
            warn!("Using the in-memory document store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        store::Options::Firestore {
            project_id,
            access_token,
            base_url,
        } => {
            info!(project_id = %project_id, "Using Firestore document store");
            let config = FirestoreConfig::new(project_id, access_token).with_base_url(base_url);
            Arc::new(FirestoreStore::new(config).context("Failed to build Firestore client")?)
        }
    };

    let email: Arc<dyn EmailSender> = match args.email_api_key {
        Some(api_key) => Arc::new(
            HttpEmailSender::new(args.email_api_url, api_key, args.email_from)
                .context("Failed to build email sender")?,
        ),
        None => {
            warn!("No email API key configured; emails are logged instead of sent");
            Arc::new(LogEmailSender)
        }
    };

    let services = Services {
        auth: Arc::new(AuthState::new(auth_config, functions)),
        store,
        email,
        support: Arc::new(SupportConfig::new(args.support_email)),
    };

    let result = api::new(args.port, services).await;
    telemetry::shutdown_tracer();
    result
}
