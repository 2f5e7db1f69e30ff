//! Client and bearer credential parsing.
//!
//! Clients authenticate at the token endpoint with either HTTP Basic
//! (`client_secret_basic`) or `client_id`/`client_secret` form parameters
//! (`client_secret_post`). Using both at once is rejected.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::TokenRequest;

/// Credentials presented by a client at the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret, absent for public clients.
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// Extracts client credentials from the `Authorization` header or the
    /// request body.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if no `client_id` was presented or the Basic header
    ///   cannot be decoded
    /// - `InvalidRequest` if both Basic and body credentials were used
    pub fn from_request(headers: &HeaderMap, request: &TokenRequest) -> AuthResult<Self> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.trim_start().starts_with("Basic "));

        if let Some(header) = header {
            let (client_id, client_secret) = parse_basic_auth(header)
                .ok_or_else(|| AuthError::invalid_client("Malformed Basic authorization header"))?;

            if request.client_secret.is_some() {
                return Err(AuthError::invalid_request(
                    "Client credentials must be sent in only one place",
                ));
            }
            if request.client_id.as_deref().is_some_and(|id| id != client_id) {
                return Err(AuthError::invalid_request(
                    "client_id does not match the Basic authorization header",
                ));
            }

            // An empty Basic password is still a presented secret, and fails
            // authentication rather than falling back to "no secret".
            return Ok(Self {
                client_id,
                client_secret: Some(client_secret),
            });
        }

        match &request.client_id {
            Some(client_id) => Ok(Self {
                client_id: client_id.clone(),
                client_secret: request.client_secret.clone(),
            }),
            None => Err(AuthError::invalid_client("Missing client_id")),
        }
    }
}

/// Parses an HTTP Basic `Authorization` header value into
/// `(client_id, client_secret)`.
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }

    Some((client_id.to_string(), client_secret.to_string()))
}

/// Returns `true` if `value` is a non-empty RFC 6750 `b64token`
/// (`1*( ALPHA / DIGIT / "-" / "." / "_" / "~" / "+" / "/" ) *"="`).
pub fn is_token68(value: &str) -> bool {
    let body = value.trim_end_matches('=');
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b'/'))
}
