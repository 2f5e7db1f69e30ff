//! OAuth 2.0 grant types.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Absolute URI form used by extension grants (RFC 6749 §4.5).
static EXTENSION_GRANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]+:\S+$").expect("extension grant pattern compiles")
});

/// The token acquisition strategies the grant flow can dispatch to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Redeem an authorization code issued after owner consent.
    AuthorizationCode,
    /// Resource owner password credentials.
    Password,
    /// The client acting on its own behalf.
    ClientCredentials,
    /// Exchange a refresh token for a fresh access token.
    RefreshToken,
    /// An extension grant identified by an absolute URI.
    Extension(String),
}

impl GrantType {
    /// Returns the `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::Extension(uri) => uri,
        }
    }

    /// Whether a refresh token may accompany the access token this grant
    /// issues.
    #[must_use]
    pub fn issues_refresh_token(&self) -> bool {
        !matches!(self, Self::ClientCredentials)
    }
}

impl FromStr for GrantType {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "password" => Ok(Self::Password),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            _ if EXTENSION_GRANT.is_match(value) => Ok(Self::Extension(value.to_string())),
            _ => Err(AuthError::unsupported_grant_type(value)),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
