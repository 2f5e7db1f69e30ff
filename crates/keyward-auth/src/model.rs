//! Persistence adapter interface.
//!
//! The flows never touch storage directly; everything goes through a
//! [`Model`]. Implementations are provided in separate crates:
//!
//! - `keyward-auth-memory` - in-process storage backed by concurrent maps
//!
//! # Implementation Notes
//!
//! Implementations must:
//!
//! - make [`Model::consume_auth_code`] and [`Model::revoke_refresh_token`]
//!   atomic, so two concurrent redemptions of the same credential can never
//!   both succeed
//! - never log token, code or secret values
//!
//! Returning `Err` from any method is treated as an adapter failure and is
//! surfaced according to the server's `passthrough_errors` policy. Use
//! `Ok(None)` for "not found".

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::TokenRequest;
use crate::types::{AccessToken, AuthCode, Client, GrantType, RefreshToken, TokenKind, User};

/// Storage and credential-validation hooks the flows depend on.
#[async_trait]
pub trait Model: Send + Sync {
    /// Looks up a client.
    ///
    /// `client_secret` is `None` for a plain lookup (authorization
    /// endpoint, public clients). Implementations should return `Ok(None)`
    /// when a secret was supplied and does not match, and must report
    /// [`Client::confidential`] so the token endpoint can refuse
    /// confidential clients that sent no secret.
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<Option<Client>>;

    /// Per-client override on top of the server-wide grant whitelist.
    async fn grant_type_allowed(&self, client_id: &str, grant_type: &GrantType)
    -> AuthResult<bool>;

    /// Resolves a bearer token.
    async fn get_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>>;

    /// Persists a newly minted access token.
    async fn save_access_token(&self, token: &AccessToken) -> AuthResult<()>;

    /// Resolves a refresh token.
    async fn get_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Persists a newly minted refresh token.
    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Revokes a refresh token.
    ///
    /// Must be atomic: returns `true` only for the single call that actually
    /// revoked a live token, `false` if it was unknown or already revoked.
    async fn revoke_refresh_token(&self, token: &str) -> AuthResult<bool>;

    /// Resolves an authorization code without consuming it.
    async fn get_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>>;

    /// Persists a newly issued authorization code.
    async fn save_auth_code(&self, code: &AuthCode) -> AuthResult<()>;

    /// Marks an authorization code as redeemed.
    ///
    /// Must be atomic: returns the code only for the first call; later calls
    /// (and unknown codes) return `None`.
    async fn consume_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>>;

    /// Validates resource owner credentials for the `password` grant.
    async fn get_user(&self, _username: &str, _password: &str) -> AuthResult<Option<User>> {
        Err(AuthError::internal(
            "model does not implement get_user (password grant)",
        ))
    }

    /// Resolves the identity a client acts as for `client_credentials`.
    async fn get_user_from_client(&self, _client: &Client) -> AuthResult<Option<User>> {
        Err(AuthError::internal(
            "model does not implement get_user_from_client (client_credentials grant)",
        ))
    }

    /// Supplies a custom token or code value. `None` falls back to a random
    /// 256-bit value.
    async fn generate_token(&self, _kind: TokenKind, _client: &Client) -> AuthResult<Option<String>> {
        Ok(None)
    }

    /// Decides the scope actually granted. The default grants what was
    /// requested.
    async fn validate_scope(
        &self,
        _client: &Client,
        _user: Option<&User>,
        requested: Option<&str>,
    ) -> AuthResult<Option<String>> {
        Ok(requested.map(ToString::to_string))
    }

    /// Handles an extension grant.
    ///
    /// Return `Ok(Some(user))` to issue tokens, `Ok(None)` to reject the
    /// grant as invalid.
    async fn extended_grant(
        &self,
        grant_type: &str,
        _request: &TokenRequest,
        _client: &Client,
    ) -> AuthResult<Option<User>> {
        Err(AuthError::unsupported_grant_type(grant_type))
    }
}
