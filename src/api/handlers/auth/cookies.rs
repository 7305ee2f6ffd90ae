//! Session cookie formatting and parsing.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::upstream::SessionTokens;

pub const SESSION_ID_COOKIE: &str = "host_session_id";
pub const SESSION_KEY_COOKIE: &str = "host_session_key";

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Error)]
pub enum CookieProfileError {
    #[error("invalid cookie domain: {0:?}")]
    InvalidDomain(String),

    #[error(transparent)]
    Header(#[from] InvalidHeaderValue),
}

/// Attributes shared by every session cookie this service sets or clears.
///
/// The clearing directives are rendered once at construction, so building a
/// logout response cannot fail.
#[derive(Clone, Debug)]
pub struct CookieProfile {
    secure: bool,
    domain: Option<String>,
    clear_id: HeaderValue,
    clear_key: HeaderValue,
}

impl CookieProfile {
    /// `secure` adds the `Secure` attribute. An empty `domain` means a host-only cookie.
    ///
    /// # Errors
    /// Returns an error if the domain contains characters that cannot appear
    /// in a `Set-Cookie` attribute.
    pub fn new(secure: bool, domain: Option<String>) -> Result<Self, CookieProfileError> {
        let domain = domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(domain) = &domain {
            let valid = domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
            if !valid {
                return Err(CookieProfileError::InvalidDomain(domain.clone()));
            }
        }

        let mut profile = Self {
            secure,
            domain,
            clear_id: HeaderValue::from_static(""),
            clear_key: HeaderValue::from_static(""),
        };
        profile.clear_id = profile.render(SESSION_ID_COOKIE, "", 0, true)?;
        profile.clear_key = profile.render(SESSION_KEY_COOKIE, "", 0, true)?;
        Ok(profile)
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    fn render(
        &self,
        name: &str,
        value: &str,
        max_age: i64,
        expire: bool,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let domain = self
            .domain
            .as_ref()
            .map(|d| format!("; Domain={d}"))
            .unwrap_or_default();
        let expires = if expire {
            format!("; Expires={EXPIRED}")
        } else {
            String::new()
        };
        // Only mark cookies secure when the dashboard is served over HTTPS.
        let secure = if self.secure { "; Secure" } else { "" };
        HeaderValue::from_str(&format!(
            "{name}={value}; Path=/{domain}; Max-Age={max_age}{expires}; HttpOnly; SameSite=Lax{secure}"
        ))
    }

    /// Two `Set-Cookie` headers carrying a freshly issued session.
    ///
    /// # Errors
    /// Returns an error if a token contains characters not allowed in a header.
    pub fn session_headers(
        &self,
        tokens: &SessionTokens,
        max_age_seconds: i64,
    ) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            self.render(SESSION_ID_COOKIE, &tokens.id, max_age_seconds, false)?,
        );
        headers.append(
            SET_COOKIE,
            self.render(
                SESSION_KEY_COOKIE,
                tokens.key.expose_secret(),
                max_age_seconds,
                false,
            )?,
        );
        Ok(headers)
    }

    /// Two `Set-Cookie` headers that expire both session cookies.
    #[must_use]
    pub fn clear_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, self.clear_id.clone());
        headers.append(SET_COOKIE, self.clear_key.clone());
        headers
    }
}

/// Read the session pair from every `Cookie` header on the request.
///
/// Returns `None` unless both cookies are present with non-empty values.
#[must_use]
pub fn extract_session_tokens(headers: &HeaderMap) -> Option<SessionTokens> {
    let mut id = None;
    let mut key = None;
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((name, val)) = pair.trim().split_once('=') else {
                continue;
            };
            let val = val.trim();
            if val.is_empty() {
                continue;
            }
            match name.trim() {
                SESSION_ID_COOKIE => id = Some(val.to_string()),
                SESSION_KEY_COOKIE => key = Some(val.to_string()),
                _ => {}
            }
        }
    }
    Some(SessionTokens::new(id?, SecretString::from(key?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(ToString::to_string))
            .collect()
    }

    #[test]
    fn clear_headers_expire_both_cookies() -> Result<()> {
        let profile = CookieProfile::new(true, Some("hostdash.app".to_string()))?;
        let cookies = set_cookies(&profile.clear_headers());
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("host_session_id=;"));
        assert!(cookies[1].starts_with("host_session_key=;"));
        for cookie in &cookies {
            assert!(cookie.contains("Max-Age=0"));
            assert!(cookie.contains("Path=/"));
            assert!(cookie.contains("Domain=hostdash.app"));
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("SameSite=Lax"));
            assert!(cookie.ends_with("; Secure"));
        }
        Ok(())
    }

    #[test]
    fn set_and_clear_share_attributes() -> Result<()> {
        let profile = CookieProfile::new(false, None)?;
        let tokens = SessionTokens::new("sid".to_string(), SecretString::from("skey".to_string()));
        let set = set_cookies(&profile.session_headers(&tokens, 604_800)?);
        let cleared = set_cookies(&profile.clear_headers());

        assert_eq!(
            set[0],
            "host_session_id=sid; Path=/; Max-Age=604800; HttpOnly; SameSite=Lax"
        );
        assert_eq!(
            set[1],
            "host_session_key=skey; Path=/; Max-Age=604800; HttpOnly; SameSite=Lax"
        );
        for cookie in cleared {
            assert!(!cookie.contains("Domain="));
            assert!(!cookie.contains("Secure"));
            assert!(cookie.contains("Path=/; Max-Age=0"));
        }
        Ok(())
    }

    #[test]
    fn blank_domain_is_host_only() -> Result<()> {
        let profile = CookieProfile::new(false, Some("  ".to_string()))?;
        assert!(profile.domain().is_none());
        Ok(())
    }

    #[test]
    fn rejects_domain_with_attribute_separator() {
        let result = CookieProfile::new(false, Some("evil.com; Path=/x".to_string()));
        assert!(matches!(result, Err(CookieProfileError::InvalidDomain(_))));
    }

    #[test]
    fn extract_requires_both_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("host_session_id=abc"));
        assert!(extract_session_tokens(&headers).is_none());

        headers.insert(
            COOKIE,
            HeaderValue::from_static("host_session_id=abc; host_session_key="),
        );
        assert!(extract_session_tokens(&headers).is_none());
    }

    #[test]
    fn extract_reads_across_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; host_session_id=abc"));
        headers.append(COOKIE, HeaderValue::from_static("host_session_key=xyz"));

        let tokens = extract_session_tokens(&headers);
        assert!(tokens.is_some());
        if let Some(tokens) = tokens {
            assert_eq!(tokens.id, "abc");
            assert_eq!(tokens.key.expose_secret(), "xyz");
        }
    }
}
