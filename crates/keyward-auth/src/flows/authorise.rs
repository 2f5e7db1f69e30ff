//! Bearer token authorization (RFC 6750).
//!
//! A token may be presented in exactly one of three places:
//!
//! 1. the `Authorization: Bearer <token>` header
//! 2. the `access_token` query parameter
//! 3. the `access_token` parameter of a form-urlencoded POST body

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::AuthResult;
use crate::context::ConfigurationContext;
use crate::error::AuthError;
use crate::oauth::is_token68;
use crate::types::AccessToken;

/// Request extension inserted once a bearer token has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedToken(pub AccessToken);

impl AuthorizedToken {
    /// Client the token was issued to.
    pub fn client_id(&self) -> &str {
        &self.0.client_id
    }

    /// Resource owner, if any.
    pub fn owner_id(&self) -> Option<&str> {
        self.0.owner_id.as_deref()
    }

    /// Granted scope, if any.
    pub fn scope(&self) -> Option<&str> {
        self.0.scope.as_deref()
    }
}

/// Validates the bearer token carried by a request.
#[derive(Debug, Clone)]
pub struct TokenAuthorizationFlow {
    ctx: Arc<ConfigurationContext>,
}

impl TokenAuthorizationFlow {
    /// Creates the flow over a shared context.
    pub fn new(ctx: Arc<ConfigurationContext>) -> Self {
        Self { ctx }
    }

    /// Extracts and resolves the bearer token.
    ///
    /// `form_body` is the buffered body of a form-urlencoded POST, `None`
    /// for any other request.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if no token was presented
    /// - `InvalidRequest` if the token is malformed or sent more than once
    /// - `InvalidToken` if the model does not know the token
    /// - `TokenExpired` if the token is past its expiry
    pub async fn authorize(&self, parts: &Parts, form_body: Option<&[u8]>) -> AuthResult<AccessToken> {
        let token = extract_bearer(parts, form_body)?;

        let Some(access_token) = self.ctx.model().get_access_token(&token).await? else {
            self.ctx.debug("access token not found");
            return Err(AuthError::invalid_token("The access token provided is invalid"));
        };

        if access_token.is_expired_at(self.ctx.now()) {
            self.ctx.debug("access token expired");
            return Err(AuthError::TokenExpired);
        }

        tracing::debug!(client_id = %access_token.client_id, "Bearer token accepted");
        Ok(access_token)
    }
}

/// Finds the single bearer token a request carries.
///
/// # Errors
///
/// See [`TokenAuthorizationFlow::authorize`].
pub fn extract_bearer(parts: &Parts, form_body: Option<&[u8]>) -> AuthResult<String> {
    let header = match parts.headers.get(AUTHORIZATION) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AuthError::invalid_request("Malformed auth header"))?;
            Some(parse_bearer_header(value)?)
        }
        None => None,
    };
    let query = parts
        .uri
        .query()
        .map(|q| access_token_param(q.as_bytes()))
        .transpose()?
        .flatten();
    let body = form_body
        .map(access_token_param)
        .transpose()?
        .flatten();

    let mut presented = [header, query, body].into_iter().flatten();
    let token = presented.next().ok_or_else(|| {
        AuthError::unauthorized("The access token was not found")
    })?;
    if presented.next().is_some() {
        return Err(AuthError::invalid_request(
            "Only one method may be used to authenticate at a time (Auth header, query or body)",
        ));
    }

    if !is_token68(&token) {
        return Err(AuthError::invalid_request("Malformed token"));
    }
    Ok(token)
}

fn parse_bearer_header(value: &str) -> AuthResult<String> {
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::invalid_request("Malformed auth header"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid_request("Malformed auth header"));
    }
    Ok(token.trim().to_string())
}

fn access_token_param(input: &[u8]) -> AuthResult<Option<String>> {
    let mut values = url::form_urlencoded::parse(input)
        .filter(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned());
    let first = values.next();
    if values.next().is_some() {
        return Err(AuthError::invalid_request(
            "Parameter 'access_token' must not be repeated",
        ));
    }
    Ok(first)
}
