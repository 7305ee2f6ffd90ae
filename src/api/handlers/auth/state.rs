//! Auth configuration and shared state.

use crate::upstream::{CloudFunctions, HostIdentity};

use super::cookies::CookieProfile;

const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    cookie_profile: CookieProfile,
    session_max_age_seconds: i64,
    owner_emails: Vec<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(cookie_profile: CookieProfile) -> Self {
        Self {
            cookie_profile,
            session_max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            owner_emails: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_session_max_age_seconds(mut self, seconds: i64) -> Self {
        self.session_max_age_seconds = seconds;
        self
    }

    /// Emails allowed to run owner-only operations. Matching ignores case.
    #[must_use]
    pub fn with_owner_emails(mut self, emails: Vec<String>) -> Self {
        self.owner_emails = emails
            .into_iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn cookie_profile(&self) -> &CookieProfile {
        &self.cookie_profile
    }

    #[must_use]
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_max_age_seconds
    }

    #[must_use]
    pub fn owner_emails(&self) -> &[String] {
        &self.owner_emails
    }

    #[must_use]
    pub fn is_owner(&self, identity: &HostIdentity) -> bool {
        identity.email.as_deref().is_some_and(|email| {
            let email = email.trim().to_ascii_lowercase();
            self.owner_emails.iter().any(|owner| *owner == email)
        })
    }
}

#[derive(Clone, Debug)]
pub struct AuthState {
    config: AuthConfig,
    functions: CloudFunctions,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, functions: CloudFunctions) -> Self {
        Self { config, functions }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn functions(&self) -> &CloudFunctions {
        &self.functions
    }
}
