//! Token endpoint (RFC 6749 §3.2).
//!
//! Requests run through a fixed sequence of checks. Everything that can be
//! decided from the request alone (method, content type, grant whitelist,
//! client identifier shape) is settled before the model is consulted.
//! Authorization codes and refresh tokens are only spent after every lookup
//! and the scope check have passed, so a rejected request leaves them
//! redeemable.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::request::Parts;
use time::format_description::well_known::Rfc3339;

use crate::AuthResult;
use crate::context::ConfigurationContext;
use crate::error::AuthError;
use crate::flows::is_form_post;
use crate::oauth::{ClientCredentials, TokenRequest, TokenResponse};
use crate::types::{AccessToken, Client, GrantType, RefreshToken, TokenKind, User, generate_token};

/// Issues tokens for the configured grant types.
#[derive(Debug, Clone)]
pub struct GrantIssuanceFlow {
    ctx: Arc<ConfigurationContext>,
}

/// What the grant-specific step resolved for one request.
#[derive(Debug)]
struct GrantState {
    grant_type: GrantType,
    client: Client,
    user: Option<User>,
    requested_scope: Option<String>,
    redemption: Option<Redemption>,
}

/// Single-use credential spent once every check has passed.
#[derive(Debug)]
enum Redemption {
    AuthCode(String),
    RefreshToken(String),
}

impl GrantIssuanceFlow {
    /// Creates the flow over a shared context.
    pub fn new(ctx: Arc<ConfigurationContext>) -> Self {
        Self { ctx }
    }

    /// Handles one token request.
    ///
    /// `body` is the raw request body; it is only parsed once the method and
    /// content type have been checked.
    ///
    /// # Errors
    ///
    /// Any OAuth error for the request, or an adapter error from the model.
    pub async fn issue(&self, parts: &Parts, body: &[u8]) -> AuthResult<TokenResponse> {
        if !is_form_post(parts) {
            return Err(AuthError::invalid_request(
                "Method must be POST with application/x-www-form-urlencoded encoding",
            ));
        }
        let request = TokenRequest::from_form(body)?;

        let grant_name = request
            .grant_type
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: grant_type"))?;

        if !self.ctx.grant_types().is_allowed(grant_name) {
            self.ctx.debug("grant type not in whitelist");
            return Err(AuthError::unsupported_grant_type(grant_name));
        }
        let grant_type: GrantType = grant_name.parse()?;

        let credentials = ClientCredentials::from_request(&parts.headers, &request)?;
        if !self.ctx.client_ids().validate(&credentials.client_id) {
            return Err(AuthError::invalid_client("Invalid client_id parameter"));
        }

        let model = self.ctx.model();
        let client = model
            .get_client(&credentials.client_id, credentials.client_secret.as_deref())
            .await?
            .ok_or_else(|| {
                self.ctx.debug("client not found or secret mismatch");
                AuthError::invalid_client("Client credentials are invalid")
            })?;
        if client.confidential && credentials.client_secret.is_none() {
            self.ctx.debug("confidential client sent no secret");
            return Err(AuthError::invalid_client("Client credentials are invalid"));
        }

        if !model.grant_type_allowed(&client.client_id, &grant_type).await? {
            return Err(AuthError::unauthorized_client(
                "The grant type is unauthorised for this client_id",
            ));
        }

        let state = self.resolve(grant_type, client, &request).await?;
        self.respond(state).await
    }

    async fn resolve(
        &self,
        grant_type: GrantType,
        client: Client,
        request: &TokenRequest,
    ) -> AuthResult<GrantState> {
        let model = self.ctx.model();

        let (user, requested_scope, redemption) = match &grant_type {
            GrantType::AuthorizationCode => {
                let code = required(&request.code, "code")?;
                let record = model
                    .get_auth_code(code)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Invalid code"))?;

                if record.client_id != client.client_id {
                    return Err(AuthError::invalid_grant("Invalid code"));
                }
                if record.is_expired_at(self.ctx.now()) {
                    return Err(AuthError::invalid_grant("Code has expired"));
                }
                if let Some(bound) = &record.redirect_uri {
                    if request.redirect_uri.as_deref() != Some(bound.as_str()) {
                        return Err(AuthError::invalid_grant("redirect_uri does not match"));
                    }
                }

                (
                    record.owner_id.map(User::new),
                    record.scope,
                    Some(Redemption::AuthCode(record.code)),
                )
            }
            GrantType::Password => {
                let username = required(&request.username, "username")?;
                let password = required(&request.password, "password")?;
                let user = model
                    .get_user(username, password)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("User credentials are invalid"))?;
                (Some(user), request.scope.clone(), None)
            }
            GrantType::ClientCredentials => {
                let user = model
                    .get_user_from_client(&client)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Client credentials are invalid"))?;
                (Some(user), request.scope.clone(), None)
            }
            GrantType::RefreshToken => {
                let token = required(&request.refresh_token, "refresh_token")?;
                let record = model
                    .get_refresh_token(token)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

                if record.client_id != client.client_id {
                    return Err(AuthError::invalid_grant("Invalid refresh token"));
                }
                if record.is_expired_at(self.ctx.now()) {
                    return Err(AuthError::invalid_grant("Refresh token has expired"));
                }
                let scope = refresh_scope(request.scope.as_deref(), record.scope)?;
                (
                    record.owner_id.map(User::new),
                    scope,
                    Some(Redemption::RefreshToken(record.token)),
                )
            }
            GrantType::Extension(name) => {
                let user = model
                    .extended_grant(name, request, &client)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Invalid grant"))?;
                (Some(user), request.scope.clone(), None)
            }
        };

        Ok(GrantState {
            grant_type,
            client,
            user,
            requested_scope,
            redemption,
        })
    }

    async fn respond(&self, state: GrantState) -> AuthResult<TokenResponse> {
        let model = self.ctx.model();
        let now = self.ctx.now();

        let scope = model
            .validate_scope(
                &state.client,
                state.user.as_ref(),
                state.requested_scope.as_deref(),
            )
            .await?;
        let owner_id = state.user.map(|user| user.id);

        let access_value = self.mint(TokenKind::AccessToken, &state.client).await?;
        let refresh_value = if state.grant_type.issues_refresh_token()
            && self.ctx.grant_types().is_allowed(GrantType::RefreshToken.as_str())
        {
            Some(self.mint(TokenKind::RefreshToken, &state.client).await?)
        } else {
            None
        };

        // Nothing is spent until every check above has passed.
        if let Some(redemption) = state.redemption {
            self.redeem(redemption).await?;
        }

        let access_ttl = self.ctx.access_token_ttl();
        let access_token = AccessToken {
            token: access_value,
            client_id: state.client.client_id.clone(),
            owner_id: owner_id.clone(),
            expires_at: access_ttl.map(|ttl| now + ttl),
            scope: scope.clone(),
        };
        model.save_access_token(&access_token).await?;

        let mut response = TokenResponse::new(access_token.token.clone());
        if let Some(expires_at) = access_token.expires_at {
            response = if self.ctx.options().expires_date_mode {
                let formatted = expires_at
                    .format(&Rfc3339)
                    .map_err(|e| AuthError::internal(format!("format expiry: {}", e)))?;
                response.with_expires_at(formatted)
            } else {
                let seconds = access_ttl.map_or(0, |ttl| ttl.whole_seconds());
                response.with_expires_in(u64::try_from(seconds).unwrap_or_default())
            };
        }

        if let Some(refresh_value) = refresh_value {
            let refresh_token = RefreshToken {
                token: refresh_value,
                client_id: state.client.client_id.clone(),
                owner_id,
                expires_at: self.ctx.refresh_token_ttl().map(|ttl| now + ttl),
                scope: scope.clone(),
            };
            model.save_refresh_token(&refresh_token).await?;
            response = response.with_refresh_token(refresh_token.token);
        }

        if let Some(scope) = scope {
            response = response.with_scope(scope);
        }

        tracing::info!(
            client_id = %state.client.client_id,
            grant_type = %state.grant_type,
            "Issued access token"
        );
        Ok(response)
    }

    async fn redeem(&self, redemption: Redemption) -> AuthResult<()> {
        let model = self.ctx.model();
        match redemption {
            Redemption::AuthCode(code) => {
                model
                    .consume_auth_code(&code)
                    .await?
                    .ok_or_else(|| AuthError::invalid_grant("Code has already been used"))?;
            }
            Redemption::RefreshToken(token) => {
                if !model.revoke_refresh_token(&token).await? {
                    return Err(AuthError::invalid_grant("Refresh token has already been used"));
                }
            }
        }
        Ok(())
    }

    async fn mint(&self, kind: TokenKind, client: &Client) -> AuthResult<String> {
        Ok(self
            .ctx
            .model()
            .generate_token(kind, client)
            .await?
            .unwrap_or_else(generate_token))
    }
}

/// Scope for a refreshed token: the original grant, or a subset of it
/// (RFC 6749 §6).
fn refresh_scope(requested: Option<&str>, granted: Option<String>) -> AuthResult<Option<String>> {
    let Some(requested) = requested else {
        return Ok(granted);
    };
    let granted: HashSet<&str> = granted.as_deref().unwrap_or_default().split_whitespace().collect();
    if requested.split_whitespace().all(|scope| granted.contains(scope)) {
        Ok(Some(requested.to_string()))
    } else {
        Err(AuthError::invalid_scope(
            "Requested scope exceeds the scope originally granted",
        ))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> AuthResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AuthError::invalid_request(format!("Missing parameter: {}", name)))
}
