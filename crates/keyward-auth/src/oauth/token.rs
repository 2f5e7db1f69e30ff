//! Token endpoint request and response types.
//!
//! Token requests arrive as `application/x-www-form-urlencoded` bodies.
//! Different fields are required depending on the `grant_type`:
//!
//! - `authorization_code`: code, (optional) redirect_uri
//! - `password`: username, password
//! - `refresh_token`: refresh_token
//! - `client_credentials`: nothing beyond client authentication
//!
//! Parameters an extension grant needs are kept in [`TokenRequest::extra`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;

/// Parsed token endpoint request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: Option<String>,

    /// Client ID (client_secret_post or public clients).
    pub client_id: Option<String>,

    /// Client secret (client_secret_post).
    pub client_secret: Option<String>,

    /// Authorization code (authorization_code grant).
    pub code: Option<String>,

    /// Redirect URI (must match the authorization request when one was used).
    pub redirect_uri: Option<String>,

    /// Refresh token (refresh_token grant).
    pub refresh_token: Option<String>,

    /// Username (password grant).
    pub username: Option<String>,

    /// Password (password grant).
    pub password: Option<String>,

    /// Requested scope.
    pub scope: Option<String>,

    /// Any other parameters, for extension grants.
    pub extra: HashMap<String, String>,
}

impl TokenRequest {
    /// Parses a form-urlencoded body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if a parameter is repeated (RFC 6749 §3.2).
    pub fn from_form(body: &[u8]) -> AuthResult<Self> {
        let mut request = Self::default();
        let mut seen = HashSet::new();

        for (key, value) in url::form_urlencoded::parse(body) {
            if !seen.insert(key.clone()) {
                return Err(AuthError::invalid_request(format!(
                    "Parameter '{}' must not be repeated",
                    key
                )));
            }

            let value = value.into_owned();
            let slot = match key.as_ref() {
                "grant_type" => &mut request.grant_type,
                "client_id" => &mut request.client_id,
                "client_secret" => &mut request.client_secret,
                "code" => &mut request.code,
                "redirect_uri" => &mut request.redirect_uri,
                "refresh_token" => &mut request.refresh_token,
                "username" => &mut request.username,
                "password" => &mut request.password,
                "scope" => &mut request.scope,
                _ => {
                    request.extra.insert(key.to_string(), value);
                    continue;
                }
            };
            // Empty parameters are treated as omitted.
            if !value.is_empty() {
                *slot = Some(value);
            }
        }

        Ok(request)
    }

    /// Returns an extension parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.extra.get(name).map(String::as_str)
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "2YotnFZFEjr1zCsicMWpAA",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Absolute access token expiry (RFC 3339), in expires-date mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,

    /// Refresh token, when one was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scope (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: None,
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Sets the lifetime in seconds.
    #[must_use]
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// Sets the absolute expiry.
    #[must_use]
    pub fn with_expires_at(mut self, instant: String) -> Self {
        self.expires_at = Some(instant);
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = Some(scope);
        self
    }
}
