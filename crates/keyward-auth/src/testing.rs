//! Mock model shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::model::Model;
use crate::oauth::TokenRequest;
use crate::types::{AccessToken, AuthCode, Client, GrantType, RefreshToken, User};

/// Records every adapter call by name so tests can assert ordering and
/// absence of calls.
#[derive(Default)]
pub(crate) struct StubModel {
    clients: Mutex<HashMap<String, (Client, Option<String>)>>,
    users: Mutex<HashMap<String, (String, User)>>,
    pub(crate) access_tokens: Mutex<HashMap<String, AccessToken>>,
    pub(crate) refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
    pub(crate) codes: Mutex<HashMap<String, AuthCode>>,
    calls: Mutex<Vec<&'static str>>,
    fail: AtomicBool,
    forbidden_scope: Option<String>,
}

impl StubModel {
    pub(crate) fn with_client(self, mut client: Client, secret: Option<&str>) -> Self {
        client.confidential = secret.is_some();
        self.clients.lock().unwrap().insert(
            client.client_id.clone(),
            (client, secret.map(ToString::to_string)),
        );
        self
    }

    pub(crate) fn with_user(self, username: &str, password: &str, id: &str) -> Self {
        self.users
            .lock()
            .unwrap()
            .insert(username.to_string(), (password.to_string(), User::new(id)));
        self
    }

    /// Makes `validate_scope` reject any request naming `scope`.
    pub(crate) fn forbid_scope(mut self, scope: &str) -> Self {
        self.forbidden_scope = Some(scope.to_string());
        self
    }

    /// Makes every later call fail with a storage error.
    pub(crate) fn fail_storage(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) -> AuthResult<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::storage("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl Model for StubModel {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<Option<Client>> {
        self.record("get_client")?;
        let clients = self.clients.lock().unwrap();
        Ok(clients.get(client_id).and_then(|(client, secret)| {
            match (secret.as_deref(), client_secret) {
                (Some(expected), Some(given)) if expected != given => None,
                _ => Some(client.clone()),
            }
        }))
    }

    async fn grant_type_allowed(&self, client_id: &str, grant_type: &GrantType) -> AuthResult<bool> {
        self.record("grant_type_allowed")?;
        let clients = self.clients.lock().unwrap();
        Ok(clients
            .get(client_id)
            .is_some_and(|(client, _)| client.is_grant_type_allowed(grant_type)))
    }

    async fn get_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        self.record("get_access_token")?;
        Ok(self.access_tokens.lock().unwrap().get(token).cloned())
    }

    async fn save_access_token(&self, token: &AccessToken) -> AuthResult<()> {
        self.record("save_access_token")?;
        self.access_tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn get_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        self.record("get_refresh_token")?;
        Ok(self.refresh_tokens.lock().unwrap().get(token).cloned())
    }

    async fn save_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        self.record("save_refresh_token")?;
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn revoke_refresh_token(&self, token: &str) -> AuthResult<bool> {
        self.record("revoke_refresh_token")?;
        Ok(self.refresh_tokens.lock().unwrap().remove(token).is_some())
    }

    async fn get_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>> {
        self.record("get_auth_code")?;
        Ok(self.codes.lock().unwrap().get(code).cloned())
    }

    async fn save_auth_code(&self, code: &AuthCode) -> AuthResult<()> {
        self.record("save_auth_code")?;
        self.codes
            .lock()
            .unwrap()
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume_auth_code(&self, code: &str) -> AuthResult<Option<AuthCode>> {
        self.record("consume_auth_code")?;
        Ok(self.codes.lock().unwrap().remove(code))
    }

    async fn get_user(&self, username: &str, password: &str) -> AuthResult<Option<User>> {
        self.record("get_user")?;
        let users = self.users.lock().unwrap();
        Ok(users
            .get(username)
            .filter(|(expected, _)| expected == password)
            .map(|(_, user)| user.clone()))
    }

    async fn get_user_from_client(&self, client: &Client) -> AuthResult<Option<User>> {
        self.record("get_user_from_client")?;
        Ok(client.owner_id.as_deref().map(User::new))
    }

    async fn validate_scope(
        &self,
        _client: &Client,
        _user: Option<&User>,
        requested: Option<&str>,
    ) -> AuthResult<Option<String>> {
        self.record("validate_scope")?;
        if let (Some(forbidden), Some(requested)) = (&self.forbidden_scope, requested) {
            if requested.split(' ').any(|s| s == forbidden) {
                return Err(AuthError::invalid_scope("Requested scope is not allowed"));
            }
        }
        Ok(requested.map(ToString::to_string))
    }

    async fn extended_grant(
        &self,
        grant_type: &str,
        request: &TokenRequest,
        _client: &Client,
    ) -> AuthResult<Option<User>> {
        self.record("extended_grant")?;
        if grant_type != "urn:example:otp" {
            return Err(AuthError::unsupported_grant_type(grant_type));
        }
        Ok((request.param("otp") == Some("123456")).then(|| User::new("otp-user")))
    }
}
