//! # Hostdash (host dashboard gateway)
//!
//! `hostdash` fronts the host-facing dashboard. It owns no user or session
//! state of its own: sessions are issued, verified and revoked by external
//! cloud functions, and business data lives in a managed document store.
//!
//! ## Session Gate
//!
//! Every page request outside the public allow-list must carry both
//! `host_session_id` and `host_session_key` cookies. The pair is checked
//! against the external verifier on each request. Any missing cookie,
//! non-success status, unparsable body or transport error redirects to
//! `/login`; the gate never falls through to "allow".
//!
//! ## Cookies
//!
//! Session cookies are set and cleared with one shared attribute profile
//! (`Path`, `Domain`, `Secure`, `SameSite`). Browsers only overwrite a cookie
//! when those attributes match, so logout and logout-all reuse the profile
//! used at login.
//!
//! ## Data
//!
//! Organizer payment records and support tickets are read and written through
//! the [`store::DocumentStore`] handle created once at startup. Bank account
//! numbers are reduced to their last four digits before they reach the store.

pub mod api;
pub mod cli;
pub mod email;
pub mod models;
pub mod password;
pub mod store;
pub mod upstream;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
