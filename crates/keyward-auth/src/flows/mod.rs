//! The three request-handling engines driven by the middleware.
//!
//! - [`TokenAuthorizationFlow`] validates bearer tokens on protected routes
//! - [`GrantIssuanceFlow`] runs the token endpoint
//! - [`AuthorizationCodeFlow`] runs the interactive consent step
//!
//! Each flow is transport-agnostic: it reads request [`Parts`] plus an
//! already-buffered body and returns a domain result. Rendering is left to
//! [`crate::middleware`].

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, header::CONTENT_TYPE};

pub mod auth_code;
pub mod authorise;
pub mod grant;

pub use auth_code::{AuthorizationCodeFlow, Consent, ConsentChecker};
pub use authorise::{AuthorizedToken, TokenAuthorizationFlow};
pub use grant::GrantIssuanceFlow;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Returns `true` if the content type is form-urlencoded (parameters such as
/// `charset` are ignored).
pub fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

/// Returns `true` for a POST request carrying a form-urlencoded body.
pub fn is_form_post(parts: &Parts) -> bool {
    parts.method == Method::POST && is_form_urlencoded(&parts.headers)
}
