use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::{api::handlers::support::DEFAULT_SUPPORT_EMAIL, email::DEFAULT_EMAIL_API_URL};

pub const ARG_EMAIL_API_KEY: &str = "email-api-key";
pub const ARG_EMAIL_API_URL: &str = "email-api-url";
pub const ARG_EMAIL_FROM: &str = "email-from";
pub const ARG_SUPPORT_EMAIL: &str = "support-email";

const DEFAULT_EMAIL_FROM: &str = "noreply@hostdash.app";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL_API_KEY)
                .long(ARG_EMAIL_API_KEY)
                .help("Email provider API key; emails are only logged when unset")
                .env("HOSTDASH_EMAIL_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_API_URL)
                .long(ARG_EMAIL_API_URL)
                .help("Email provider send endpoint")
                .env("HOSTDASH_EMAIL_API_URL")
                .default_value(DEFAULT_EMAIL_API_URL),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for outbound email")
                .env("HOSTDASH_EMAIL_FROM")
                .default_value(DEFAULT_EMAIL_FROM),
        )
        .arg(
            Arg::new(ARG_SUPPORT_EMAIL)
                .long(ARG_SUPPORT_EMAIL)
                .help("Support inbox that receives ticket notifications")
                .env("HOSTDASH_SUPPORT_EMAIL")
                .default_value(DEFAULT_SUPPORT_EMAIL),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_key: Option<SecretString>,
    pub api_url: String,
    pub from: String,
    pub support_email: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let get_or = |id: &str, default: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            api_key: matches
                .get_one::<String>(ARG_EMAIL_API_KEY)
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::from(v.clone())),
            api_url: get_or(ARG_EMAIL_API_URL, DEFAULT_EMAIL_API_URL),
            from: get_or(ARG_EMAIL_FROM, DEFAULT_EMAIL_FROM),
            support_email: get_or(ARG_SUPPORT_EMAIL, DEFAULT_SUPPORT_EMAIL),
        }
    }
}
