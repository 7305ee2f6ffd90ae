//! Cloud function endpoint overrides.

use clap::{Arg, ArgMatches, Command};

use crate::upstream::Endpoints;

pub const ARG_VERIFY_SESSION_URL: &str = "verify-session-url";
pub const ARG_CREATE_SESSION_URL: &str = "create-session-url";
pub const ARG_LOGOUT_URL: &str = "logout-url";
pub const ARG_LOGOUT_ALL_URL: &str = "logout-all-url";
pub const ARG_REGISTER_HOST_URL: &str = "register-host-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERIFY_SESSION_URL)
                .long(ARG_VERIFY_SESSION_URL)
                .help("Session verification function URL")
                .env("HOSTDASH_VERIFY_SESSION_URL"),
        )
        .arg(
            Arg::new(ARG_CREATE_SESSION_URL)
                .long(ARG_CREATE_SESSION_URL)
                .help("Session creation function URL")
                .env("HOSTDASH_CREATE_SESSION_URL"),
        )
        .arg(
            Arg::new(ARG_LOGOUT_URL)
                .long(ARG_LOGOUT_URL)
                .help("Single-device logout function URL")
                .env("HOSTDASH_LOGOUT_URL"),
        )
        .arg(
            Arg::new(ARG_LOGOUT_ALL_URL)
                .long(ARG_LOGOUT_ALL_URL)
                .help("All-devices logout function URL")
                .env("HOSTDASH_LOGOUT_ALL_URL"),
        )
        .arg(
            Arg::new(ARG_REGISTER_HOST_URL)
                .long(ARG_REGISTER_HOST_URL)
                .help("Host registration function URL")
                .env("HOSTDASH_REGISTER_HOST_URL"),
        )
}

/// Hosted defaults with any configured overrides applied.
#[must_use]
pub fn parse(matches: &ArgMatches) -> Endpoints {
    let mut endpoints = Endpoints::default();
    let overrides = [
        (ARG_VERIFY_SESSION_URL, &mut endpoints.verify_session),
        (ARG_CREATE_SESSION_URL, &mut endpoints.create_session),
        (ARG_LOGOUT_URL, &mut endpoints.logout),
        (ARG_LOGOUT_ALL_URL, &mut endpoints.logout_all),
        (ARG_REGISTER_HOST_URL, &mut endpoints.register_host),
    ];
    for (id, slot) in overrides {
        if let Some(url) = matches
            .get_one::<String>(id)
            .filter(|v| !v.trim().is_empty())
        {
            slot.clone_from(url);
        }
    }
    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::DEFAULT_FUNCTIONS_BASE;

    #[test]
    fn defaults_point_at_hosted_functions() {
        temp_env::with_vars(
            [
                ("HOSTDASH_VERIFY_SESSION_URL", None::<&str>),
                ("HOSTDASH_LOGOUT_URL", None::<&str>),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let endpoints = parse(&matches);
                assert_eq!(
                    endpoints.verify_session,
                    format!("{DEFAULT_FUNCTIONS_BASE}/verifyHostSession")
                );
                assert_eq!(
                    endpoints.logout,
                    format!("{DEFAULT_FUNCTIONS_BASE}/logoutHost")
                );
            },
        );
    }

    #[test]
    fn env_overrides_single_endpoint() {
        temp_env::with_vars(
            [
                ("HOSTDASH_LOGOUT_ALL_URL", Some("http://localhost:5001/logoutAll")),
                ("HOSTDASH_REGISTER_HOST_URL", Some("")),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let endpoints = parse(&matches);
                assert_eq!(endpoints.logout_all, "http://localhost:5001/logoutAll");
                assert_eq!(
                    endpoints.register_host,
                    format!("{DEFAULT_FUNCTIONS_BASE}/registerHost")
                );
            },
        );
    }
}
