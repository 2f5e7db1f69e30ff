//! Client and resource owner records returned by the model.

use serde::{Deserialize, Serialize};

use super::GrantType;

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Redirect URIs accepted by the authorization code flow.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use. Empty means any grant the server
    /// accepts.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Identity the client acts as for `client_credentials` tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Confidential clients must authenticate with a secret at the token
    /// endpoint.
    #[serde(default)]
    pub confidential: bool,
}

impl Client {
    /// Creates a client with no redirect URIs and no grant restrictions.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uris: Vec::new(),
            grant_types: Vec::new(),
            owner_id: None,
            confidential: false,
        }
    }

    /// Marks the client as confidential.
    #[must_use]
    pub fn confidential(mut self) -> Self {
        self.confidential = true;
        self
    }

    /// Adds an accepted redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Restricts the client to the given grant type (cumulative).
    #[must_use]
    pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant_types.push(grant_type);
        self
    }

    /// Sets the identity used for `client_credentials` tokens.
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Returns `true` if the client may use `grant_type`.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: &GrantType) -> bool {
        self.grant_types.is_empty() || self.grant_types.contains(grant_type)
    }

    /// Returns `true` if `uri` exactly matches a registered redirect URI.
    #[must_use]
    pub fn is_redirect_uri_registered(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }
}

/// A resource owner resolved by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable owner identifier recorded on issued tokens.
    pub id: String,
}

impl User {
    /// Creates a user reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
