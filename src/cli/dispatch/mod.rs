//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, email, store, upstream, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches);
    let email_opts = email::Options::parse(matches);
    let store_opts = store::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        endpoints: upstream::parse(matches),
        cookie_domain: auth_opts.cookie_domain,
        production: auth_opts.production,
        session_max_age_seconds: auth_opts.session_max_age_seconds,
        owner_emails: auth_opts.owner_emails,
        store: store_opts,
        email_api_key: email_opts.api_key,
        email_api_url: email_opts.api_url,
        email_from: email_opts.from,
        support_email: email_opts.support_email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firestore_without_project_fails() {
        temp_env::with_vars(
            [
                ("HOSTDASH_STORE", Some("firestore")),
                ("HOSTDASH_FIRESTORE_PROJECT_ID", None::<&str>),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["hostdash"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --firestore-project-id"));
                }
            },
        );
    }

    #[test]
    fn server_action_from_flags() {
        temp_env::with_vars(
            [
                ("HOSTDASH_STORE", None::<&str>),
                ("HOSTDASH_PORT", None),
                ("HOSTDASH_OWNER_EMAILS", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "hostdash",
                    "--port",
                    "9090",
                    "--production",
                    "--owner-emails",
                    "owner@hostdash.app",
                ]);
                match handler(&matches) {
                    Ok(Action::Server(args)) => {
                        assert_eq!(args.port, 9090);
                        assert!(args.production);
                        assert_eq!(args.owner_emails, vec!["owner@hostdash.app"]);
                        assert!(matches!(args.store, store::Options::Memory));
                    }
                    Err(err) => panic!("unexpected error: {err}"),
                }
            },
        );
    }
}
