use super::handlers::{
    self,
    auth::{register, session},
    health, payments, support, volunteers,
};
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::login,
        session::session,
        session::logout,
        session::logout_all,
        register::register_host,
        volunteers::create,
        volunteers::update_password,
        payments::payment_record,
        payments::save_bank_details,
        payments::toggle_payout_kyc,
        support::create_ticket,
        support::list_tickets,
        support::get_ticket,
        support::add_message,
        support::update_status,
        support::notify,
    ),
    components(schemas(handlers::ErrorBody, handlers::SuccessBody)),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Host sessions and registration"),
        (name = "volunteers", description = "Volunteer password hashing"),
        (name = "payments", description = "Organizer bank details and payout KYC"),
        (name = "support", description = "Support tickets")
    )
)]
struct ApiDoc;

/// `OpenAPI` document with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match (author.find('<'), author.rfind('>')) {
        (Some(start), Some(end)) if start < end => {
            let name = optional_str(author[..start].trim());
            let email = optional_str(author[start + 1..end].trim());
            (name, email)
        }
        _ => (optional_str(author), None),
    }
}

fn optional_str(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_uses_cargo_metadata() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        let contact = doc.info.contact.as_ref();
        assert_eq!(
            contact.and_then(|c| c.email.as_deref()),
            Some("team@hostdash.app")
        );
        assert_eq!(
            doc.info.license.as_ref().map(|l| l.name.as_str()),
            Some("BSD-3-Clause")
        );
    }

    #[test]
    fn openapi_lists_session_and_data_routes() {
        let doc = openapi();
        for path in [
            "/api/logout",
            "/api/logout-all",
            "/api/register-host",
            "/api/volunteers/update-password",
            "/api/owner/toggle-payout-kyc",
            "/api/support/notify",
            "/api/support/tickets/{ticket_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Team Hostdash <team@hostdash.app>"),
            (Some("Team Hostdash"), Some("team@hostdash.app"))
        );
        assert_eq!(parse_author("solo"), (Some("solo"), None));
    }
}
