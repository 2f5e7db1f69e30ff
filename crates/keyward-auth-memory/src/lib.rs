//! # keyward-auth-memory
//!
//! In-memory [`Model`] for keyward-auth.
//!
//! All records live in concurrent maps and are lost on restart, so this is
//! meant for tests, demos and single-process deployments.
//!
//! - Client secrets are stored as SHA-256 digests.
//! - User passwords are stored as Argon2id PHC strings.
//! - Authorization codes and refresh tokens are removed atomically on
//!   redemption, so a second concurrent redemption always loses.
//!
//! ```ignore
//! let model = MemoryModel::new();
//! model.add_client(Client::new("web-app").with_redirect_uri("https://app.example.com/cb"), Some("secret"));
//! model.add_user("alice", "wonderland", User::new("user-alice"))?;
//! ```

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use dashmap::DashMap;
use keyward_auth::clock::{Clock, SystemClock};
use keyward_auth::{
    AccessToken, AuthCode, AuthError, AuthResult, Client, GrantType, Model, RefreshToken, User,
};

struct ClientEntry {
    client: Client,
    secret_hash: Option<String>,
}

struct UserEntry {
    password_hash: String,
    user: User,
}

/// Model keeping every record in memory.
pub struct MemoryModel {
    clients: DashMap<String, ClientEntry>,
    users: DashMap<String, UserEntry>,
    access_tokens: DashMap<String, AccessToken>,
    refresh_tokens: DashMap<String, RefreshToken>,
    auth_codes: DashMap<String, AuthCode>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryModel")
            .field("clients", &self.clients.len())
            .field("users", &self.users.len())
            .field("access_tokens", &self.access_tokens.len())
            .field("refresh_tokens", &self.refresh_tokens.len())
            .field("auth_codes", &self.auth_codes.len())
            .finish()
    }
}

impl MemoryModel {
    /// Creates an empty model using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty model; `clock` decides what
    /// [`cleanup_expired`](Self::cleanup_expired) considers expired.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            users: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            auth_codes: DashMap::new(),
            clock,
        }
    }

    /// Registers a client. `secret` is `None` for public clients; a client
    /// registered with a secret is marked confidential.
    pub fn add_client(&self, mut client: Client, secret: Option<&str>) {
        client.confidential = secret.is_some();
        let entry = ClientEntry {
            secret_hash: secret.map(hash_secret),
            client,
        };
        self.clients.insert(entry.client.client_id.clone(), entry);
    }

    /// Registers a resource owner for the password grant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the password cannot be hashed.
    pub fn add_user(&self, username: &str, password: &str, user: User) -> AuthResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {}", e)))?
            .to_string();

        self.users.insert(
            username.to_string(),
            UserEntry {
                password_hash,
                user,
            },
        );
        Ok(())
    }

    /// Drops expired access tokens, refresh tokens and codes.
    ///
    /// Returns how many records were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.record_count();

        self.access_tokens.retain(|_, token| !token.is_expired_at(now));
        self.refresh_tokens.retain(|_, token| !token.is_expired_at(now));
        self.auth_codes.retain(|_, code| !code.is_expired_at(now));

        let removed = before - self.record_count();
        if removed > 0 {
            tracing::debug!(removed, "Removed expired credentials");
        }
        removed
    }

    /// Number of stored access tokens.
    pub fn access_token_count(&self) -> usize {
        self.access_tokens.len()
    }

    /// Number of stored refresh tokens.
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    /// Number of outstanding authorization codes.
    pub fn auth_code_count(&self) -> usize {
        self.auth_codes.len()
    }

    fn record_count(&self) -> usize {
        self.access_tokens.len() + self.refresh_tokens.len() + self.auth_codes.len()
    }
}

#[async_trait]
impl Model for MemoryModel {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<Option<Client>> {
        let Some(entry) = self.clients.get(client_id) else {
            return Ok(None);
        };

        match (&entry.secret_hash, client_secret) {
            (Some(expected), Some(given)) if *expected != hash_secret(given) => Ok(None),
            // A secret presented for a public client is an authentication failure.
            (None, Some(_)) => Ok(None),
            // Lookup only; the token endpoint refuses confidential clients
            // that did not authenticate.
            (Some(_), None) | (None, None) | (Some(_), Some(_)) => {
                Ok(Some(entry.client.clone()))
            }
        }
    }

    async fn grant_type_allowed(&self, client_id: &str, grant_type: &GrantType) -> AuthResult<bool> {
        Ok(self
            .clients
            .get(client_id)
            .is_some_and(|entry| entry.client.is_grant_type_allowed(grant_type)))
    }

    async fn get_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        Ok(self.access_tokens.get(token).map(|t| t.clone()))
    }

    async fn save_access_token(&self, token: &AccessToken) -> AuthResult<()> {
        self.access_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.refresh_tokens.get(token).map(|t| t.clone()))
    }

    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        self.refresh_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn revoke_refresh_token(&self, token: &str) -> AuthResult<bool> {
        Ok(self.refresh_tokens.remove(token).is_some())
    }

    async fn get_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>> {
        Ok(self.auth_codes.get(code).map(|c| c.clone()))
    }

    async fn save_auth_code(&self, code: &AuthCode) -> AuthResult<()> {
        self.auth_codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>> {
        Ok(self.auth_codes.remove(code).map(|(_, record)| record))
    }

    async fn get_user(&self, username: &str, password: &str) -> AuthResult<Option<User>> {
        let Some(entry) = self.users.get(username) else {
            return Ok(None);
        };

        let parsed = PasswordHash::new(&entry.password_hash)
            .map_err(|e| AuthError::internal(format!("stored password hash is invalid: {}", e)))?;
        let verified = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        Ok(verified.then(|| entry.user.clone()))
    }

    async fn get_user_from_client(&self, client: &Client) -> AuthResult<Option<User>> {
        let id = client.owner_id.as_deref().unwrap_or(&client.client_id);
        Ok(Some(User::new(id)))
    }
}

fn hash_secret(secret: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
