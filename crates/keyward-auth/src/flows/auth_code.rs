//! Interactive authorization code issuance (RFC 6749 §4.1.1 - §4.1.2).
//!
//! The client and redirect URI are verified first and errors up to that
//! point are answered directly. Once the redirect URI is trusted every
//! outcome, including denial, is reported by redirecting back to it.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use axum::http::request::Parts;
use url::Url;

use crate::AuthResult;
use crate::context::ConfigurationContext;
use crate::error::{AuthError, ErrorCategory};
use crate::flows::is_form_urlencoded;
use crate::oauth::AuthorizationRequest;
use crate::types::{AuthCode, Client, TokenKind, generate_token};

/// Resource owner's answer to an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consent {
    /// Access granted, optionally on behalf of a known owner.
    Granted {
        /// Owner recorded on the code and on tokens issued for it.
        owner: Option<String>,
    },
    /// Access denied.
    Denied,
}

impl Consent {
    /// Consent granted by `owner`.
    pub fn granted(owner: impl Into<String>) -> Self {
        Self::Granted {
            owner: Some(owner.into()),
        }
    }
}

impl From<bool> for Consent {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Granted { owner: None }
        } else {
            Self::Denied
        }
    }
}

/// Decides whether the resource owner approved a request.
///
/// Implemented for any `Fn(&Parts) -> impl Into<Consent>`, so plain
/// closures work:
///
/// ```ignore
/// server.auth_code_grant(|parts: &Parts| {
///     parts.extensions.get::<Session>().map(|s| Consent::granted(&s.user_id))
///         .unwrap_or(Consent::Denied)
/// })
/// ```
#[async_trait]
pub trait ConsentChecker: Send + Sync + 'static {
    /// Returns the owner's decision for the request.
    async fn check(&self, parts: &Parts) -> AuthResult<Consent>;
}

#[async_trait]
impl<F, C> ConsentChecker for F
where
    F: Fn(&Parts) -> C + Send + Sync + 'static,
    C: Into<Consent> + Send,
{
    async fn check(&self, parts: &Parts) -> AuthResult<Consent> {
        Ok(self(parts).into())
    }
}

/// Authorization endpoint for the `code` response type.
pub struct AuthorizationCodeFlow {
    ctx: Arc<ConfigurationContext>,
    check: Arc<dyn ConsentChecker>,
}

impl AuthorizationCodeFlow {
    /// Creates the flow with the given consent check.
    pub fn new(ctx: Arc<ConfigurationContext>, check: Arc<dyn ConsentChecker>) -> Self {
        Self { ctx, check }
    }

    /// Handles one authorization request.
    ///
    /// Returns the location to redirect the user agent to, carrying either
    /// `code` or `error`, plus `state` when the client sent one.
    ///
    /// # Errors
    ///
    /// Errors detected before the redirect URI is verified, and adapter
    /// errors when `passthrough_errors` is set.
    pub async fn handle(&self, parts: &Parts, form_body: Option<&[u8]>) -> AuthResult<Url> {
        let params = match form_body {
            _ if parts.method == Method::GET => AuthorizationRequest::parse(
                parts.uri.query().unwrap_or_default().as_bytes(),
            )?,
            Some(body) if parts.method == Method::POST && is_form_urlencoded(&parts.headers) => {
                AuthorizationRequest::parse(body)?
            }
            _ => {
                return Err(AuthError::invalid_request(
                    "Method must be GET, or POST with application/x-www-form-urlencoded encoding",
                ));
            }
        };

        let (client, redirect) = self.verify_client(&params).await?;
        let state = params.state.as_deref();

        match self.issue(parts, &params, client).await {
            Ok(code) => Ok(with_params(
                redirect,
                &[("code", Some(code.as_str())), ("state", state)],
            )),
            Err(err)
                if err.category() == ErrorCategory::Adapter
                    && self.ctx.options().passthrough_errors =>
            {
                Err(err)
            }
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(error = %err, "Authorization request failed");
                }
                let description = err.description();
                Ok(with_params(
                    redirect,
                    &[
                        ("error", Some(err.oauth_error_code())),
                        ("error_description", Some(description.as_str())),
                        ("state", state),
                    ],
                ))
            }
        }
    }

    async fn verify_client(&self, params: &AuthorizationRequest) -> AuthResult<(Client, Url)> {
        let client_id = params
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: client_id"))?;
        if !self.ctx.client_ids().validate(client_id) {
            return Err(AuthError::invalid_request("Invalid client_id parameter"));
        }
        let redirect_uri = params
            .redirect_uri
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing parameter: redirect_uri"))?;

        let client = self
            .ctx
            .model()
            .get_client(client_id, None)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Invalid client credentials"))?;

        if !client.is_redirect_uri_registered(redirect_uri) {
            self.ctx.debug("redirect_uri not registered for client");
            return Err(AuthError::invalid_request("redirect_uri does not match"));
        }

        let redirect = Url::parse(redirect_uri)
            .map_err(|_| AuthError::invalid_request("Invalid redirect_uri"))?;
        Ok((client, redirect))
    }

    async fn issue(
        &self,
        parts: &Parts,
        params: &AuthorizationRequest,
        client: Client,
    ) -> AuthResult<String> {
        match params.response_type.as_deref() {
            Some("code") => {}
            Some(other) => return Err(AuthError::unsupported_response_type(other)),
            None => return Err(AuthError::invalid_request("Missing parameter: response_type")),
        }

        let owner = match self.check.check(parts).await? {
            Consent::Granted { owner } => owner,
            Consent::Denied => {
                self.ctx.debug("resource owner denied access");
                return Err(AuthError::access_denied(
                    "The user denied access to your application",
                ));
            }
        };

        let model = self.ctx.model();
        let code = model
            .generate_token(TokenKind::AuthorizationCode, &client)
            .await?
            .unwrap_or_else(generate_token);

        let record = AuthCode {
            code: code.clone(),
            client_id: client.client_id,
            owner_id: owner,
            redirect_uri: params.redirect_uri.clone(),
            expires_at: self.ctx.now() + self.ctx.auth_code_ttl(),
            scope: params.scope.clone(),
        };
        model.save_auth_code(&record).await?;

        tracing::info!(client_id = %record.client_id, "Issued authorization code");
        Ok(code)
    }
}

fn with_params(mut url: Url, params: &[(&str, Option<&str>)]) -> Url {
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in params {
            if let Some(value) = value {
                pairs.append_pair(name, value);
            }
        }
    }
    url
}
