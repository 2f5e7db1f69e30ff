//! Authorization endpoint request parameters (RFC 6749 §4.1.1).

use std::collections::HashSet;

use crate::AuthResult;
use crate::error::AuthError;

/// Parameters of an authorization request.
///
/// Read from the query string for GET requests or from a form body for
/// POST requests (e.g. a consent form submission).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Must be `code`.
    pub response_type: Option<String>,
    /// Requesting client.
    pub client_id: Option<String>,
    /// Where to send the user agent back to.
    pub redirect_uri: Option<String>,
    /// Opaque value echoed back to the client.
    pub state: Option<String>,
    /// Requested scope.
    pub scope: Option<String>,
}

impl AuthorizationRequest {
    /// Parses form-urlencoded parameters (query string or body).
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if a parameter is repeated.
    pub fn parse(input: &[u8]) -> AuthResult<Self> {
        let mut request = Self::default();
        let mut seen = HashSet::new();

        for (key, value) in url::form_urlencoded::parse(input) {
            if !seen.insert(key.clone()) {
                return Err(AuthError::invalid_request(format!(
                    "Parameter '{}' must not be repeated",
                    key
                )));
            }
            let slot = match key.as_ref() {
                "response_type" => &mut request.response_type,
                "client_id" => &mut request.client_id,
                "redirect_uri" => &mut request.redirect_uri,
                "state" => &mut request.state,
                "scope" => &mut request.scope,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        Ok(request)
    }
}
