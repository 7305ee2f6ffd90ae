use anyhow::{bail, Result};
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_STORE: &str = "store";
pub const ARG_FIRESTORE_PROJECT_ID: &str = "firestore-project-id";
pub const ARG_FIRESTORE_ACCESS_TOKEN: &str = "firestore-access-token";
pub const ARG_FIRESTORE_BASE_URL: &str = "firestore-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORE)
                .long(ARG_STORE)
                .help("Document store backend")
                .env("HOSTDASH_STORE")
                .default_value("memory")
                .value_parser(PossibleValuesParser::new(["memory", "firestore"])),
        )
        .arg(
            Arg::new(ARG_FIRESTORE_PROJECT_ID)
                .long(ARG_FIRESTORE_PROJECT_ID)
                .help("Firestore project id")
                .env("HOSTDASH_FIRESTORE_PROJECT_ID"),
        )
        .arg(
            Arg::new(ARG_FIRESTORE_ACCESS_TOKEN)
                .long(ARG_FIRESTORE_ACCESS_TOKEN)
                .help("Firestore admin access token")
                .env("HOSTDASH_FIRESTORE_ACCESS_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_FIRESTORE_BASE_URL)
                .long(ARG_FIRESTORE_BASE_URL)
                .help("Firestore REST base URL")
                .env("HOSTDASH_FIRESTORE_BASE_URL")
                .default_value("https://firestore.googleapis.com"),
        )
}

#[derive(Debug)]
pub enum Options {
    Memory,
    Firestore {
        project_id: String,
        access_token: SecretString,
        base_url: String,
    },
}

impl Options {
    /// Parse store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Firestore backend is selected without its credentials.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        match matches.get_one::<String>(ARG_STORE).map(String::as_str) {
            Some("firestore") => {
                let Some(project_id) = get_non_empty(ARG_FIRESTORE_PROJECT_ID) else {
                    bail!("missing required argument: --{ARG_FIRESTORE_PROJECT_ID}");
                };
                let Some(access_token) = get_non_empty(ARG_FIRESTORE_ACCESS_TOKEN) else {
                    bail!("missing required argument: --{ARG_FIRESTORE_ACCESS_TOKEN}");
                };
                Ok(Self::Firestore {
                    project_id,
                    access_token: SecretString::from(access_token),
                    base_url: get_non_empty(ARG_FIRESTORE_BASE_URL)
                        .unwrap_or_else(|| "https://firestore.googleapis.com".to_string()),
                })
            }
            _ => Ok(Self::Memory),
        }
    }
}
