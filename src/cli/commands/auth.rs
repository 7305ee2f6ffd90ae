use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};

pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_PRODUCTION: &str = "production";
pub const ARG_SESSION_MAX_AGE_SECONDS: &str = "session-max-age-seconds";
pub const ARG_OWNER_EMAILS: &str = "owner-emails";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Domain attribute for session cookies (host-only when unset)")
                .env("HOSTDASH_COOKIE_DOMAIN"),
        )
        .arg(
            Arg::new(ARG_PRODUCTION)
                .long(ARG_PRODUCTION)
                .help("Production mode: session cookies are marked Secure")
                .env("HOSTDASH_PRODUCTION")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE_SECONDS)
                .long(ARG_SESSION_MAX_AGE_SECONDS)
                .help("Session cookie Max-Age in seconds")
                .env("HOSTDASH_SESSION_MAX_AGE_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_OWNER_EMAILS)
                .long(ARG_OWNER_EMAILS)
                .help("Comma separated emails allowed to run owner operations")
                .env("HOSTDASH_OWNER_EMAILS")
                .value_delimiter(','),
        )
}

#[derive(Debug)]
pub struct Options {
    pub cookie_domain: Option<String>,
    pub production: bool,
    pub session_max_age_seconds: i64,
    pub owner_emails: Vec<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            cookie_domain: matches
                .get_one::<String>(ARG_COOKIE_DOMAIN)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            production: matches.get_flag(ARG_PRODUCTION),
            session_max_age_seconds: matches
                .get_one::<i64>(ARG_SESSION_MAX_AGE_SECONDS)
                .copied()
                .unwrap_or(604_800),
            owner_emails: matches
                .get_many::<String>(ARG_OWNER_EMAILS)
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(args: Vec<&str>) -> Options {
        let matches = with_args(Command::new("test")).get_matches_from(args);
        Options::parse(&matches)
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("HOSTDASH_COOKIE_DOMAIN", None::<&str>),
                ("HOSTDASH_PRODUCTION", None::<&str>),
                ("HOSTDASH_SESSION_MAX_AGE_SECONDS", None::<&str>),
                ("HOSTDASH_OWNER_EMAILS", None::<&str>),
            ],
            || {
                let options = parse_with(vec!["test"]);
                assert!(options.cookie_domain.is_none());
                assert!(!options.production);
                assert_eq!(options.session_max_age_seconds, 604_800);
                assert!(options.owner_emails.is_empty());
            },
        );
    }

    #[test]
    fn env_values() {
        temp_env::with_vars(
            [
                ("HOSTDASH_COOKIE_DOMAIN", Some(".hostdash.app")),
                ("HOSTDASH_PRODUCTION", Some("true")),
                ("HOSTDASH_SESSION_MAX_AGE_SECONDS", Some("3600")),
                (
                    "HOSTDASH_OWNER_EMAILS",
                    Some("owner@hostdash.app,ops@hostdash.app"),
                ),
            ],
            || {
                let options = parse_with(vec!["test"]);
                assert_eq!(options.cookie_domain.as_deref(), Some(".hostdash.app"));
                assert!(options.production);
                assert_eq!(options.session_max_age_seconds, 3600);
                assert_eq!(
                    options.owner_emails,
                    vec!["owner@hostdash.app", "ops@hostdash.app"]
                );
            },
        );
    }

    #[test]
    fn production_flag() {
        temp_env::with_vars([("HOSTDASH_PRODUCTION", None::<&str>)], || {
            assert!(parse_with(vec!["test", "--production"]).production);
        });
    }
}
