//! Host session handling.
//!
//! A host session is a pair of opaque tokens issued by the external auth
//! functions and carried in two `HttpOnly` cookies. This service never
//! decides whether a session is live; it forwards the pair to the verifier
//! and trusts the answer.
//!
//! ## Cookie profile
//!
//! Login, logout and logout-all share one cookie profile (`Path`, `Domain`,
//! `SameSite`, `Secure`). A browser only drops a cookie when the clearing
//! directive matches the attributes it was set with, so every route builds
//! its `Set-Cookie` values from the same [`CookieProfile`].

pub(crate) mod cookies;
pub(crate) mod gate;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
mod state;

pub use cookies::{CookieProfile, CookieProfileError, SESSION_ID_COOKIE, SESSION_KEY_COOKIE};
pub use gate::is_public_path;
pub use state::{AuthConfig, AuthState};
