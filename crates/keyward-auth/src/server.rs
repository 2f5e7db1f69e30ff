//! The orchestrator: one configured server, many middleware layers.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, DebugSink, ServerOptions};
use crate::context::ConfigurationContext;
use crate::flows::{
    AuthorizationCodeFlow, ConsentChecker, GrantIssuanceFlow, TokenAuthorizationFlow,
};
use crate::middleware::{
    AuthCodeGrant, Authorize, Bypass, Grant, OAuthLayer, RouteTag, TagRouteLayer,
};
use crate::model::Model;
use crate::validation::{ClientIdValidator, GrantTypeWhitelist};

/// A configured OAuth 2.0 authorization server.
///
/// Cloning is cheap; every clone and every layer it produces share the same
/// [`ConfigurationContext`].
///
/// # Example
///
/// ```ignore
/// let server = OAuth2Server::builder()
///     .model(Arc::new(MemoryModel::new()))
///     .options(ServerOptions::with_grants(["password", "refresh_token"]))
///     .build()?;
///
/// let app = Router::new()
///     .route("/oauth/token", post(|| async {}).layer(server.grant()))
///     .route("/secret", get(secret).layer(server.authorize()));
/// ```
#[derive(Debug, Clone)]
pub struct OAuth2Server {
    ctx: Arc<ConfigurationContext>,
}

impl OAuth2Server {
    /// Starts building a server.
    pub fn builder() -> OAuth2ServerBuilder {
        OAuth2ServerBuilder::default()
    }

    /// Layer that requires a valid bearer token on every request.
    pub fn authorize(&self) -> OAuthLayer<Authorize> {
        OAuthLayer::new(Authorize::new(self.ctx.clone(), None), self.ctx.clone())
    }

    /// Layer that requires a valid bearer token only on routes tagged with
    /// `tag` (see [`tag_route`](Self::tag_route)); other requests pass
    /// straight through.
    pub fn check_authorize(&self, tag: impl Into<RouteTag>) -> OAuthLayer<Authorize> {
        OAuthLayer::new(
            Authorize::new(self.ctx.clone(), Some(tag.into())),
            self.ctx.clone(),
        )
    }

    /// Layer implementing the token endpoint.
    pub fn grant(&self) -> OAuthLayer<Grant> {
        OAuthLayer::new(Grant::new(self.ctx.clone()), self.ctx.clone())
    }

    /// Layer implementing the authorization endpoint, asking `check` for
    /// the resource owner's consent.
    pub fn auth_code_grant(&self, check: impl ConsentChecker) -> OAuthLayer<AuthCodeGrant> {
        OAuthLayer::new(
            AuthCodeGrant::new(self.ctx.clone(), Arc::new(check)),
            self.ctx.clone(),
        )
    }

    /// No-op layer marking a route as exempt.
    pub fn bypass(&self) -> Bypass {
        Bypass
    }

    /// Layer tagging a route for [`check_authorize`](Self::check_authorize).
    ///
    /// The tag has to be applied outside the check:
    ///
    /// ```ignore
    /// get(handler).layer(
    ///     ServiceBuilder::new()
    ///         .layer(server.tag_route("secure"))
    ///         .layer(server.check_authorize("secure")),
    /// )
    /// ```
    pub fn tag_route(&self, tag: impl Into<RouteTag>) -> TagRouteLayer {
        TagRouteLayer::new(tag.into())
    }

    /// Replaces the debug sink for all existing and future layers.
    pub fn set_debug_sink(&self, sink: DebugSink) {
        self.ctx.set_debug_sink(sink);
    }

    /// The shared configuration.
    pub fn context(&self) -> &Arc<ConfigurationContext> {
        &self.ctx
    }

    /// The server options.
    pub fn options(&self) -> &ServerOptions {
        self.ctx.options()
    }

    /// The client identifier validator.
    pub fn client_ids(&self) -> &ClientIdValidator {
        self.ctx.client_ids()
    }

    /// The grant type whitelist.
    pub fn grant_types(&self) -> &GrantTypeWhitelist {
        self.ctx.grant_types()
    }

    /// Bearer token flow, for use outside the middleware.
    pub fn token_authorization(&self) -> TokenAuthorizationFlow {
        TokenAuthorizationFlow::new(self.ctx.clone())
    }

    /// Token endpoint flow, for use outside the middleware.
    pub fn grant_issuance(&self) -> GrantIssuanceFlow {
        GrantIssuanceFlow::new(self.ctx.clone())
    }

    /// Authorization endpoint flow, for use outside the middleware.
    pub fn authorization_code(&self, check: impl ConsentChecker) -> AuthorizationCodeFlow {
        AuthorizationCodeFlow::new(self.ctx.clone(), Arc::new(check))
    }
}

/// Builder for [`OAuth2Server`].
#[derive(Default)]
pub struct OAuth2ServerBuilder {
    model: Option<Arc<dyn Model>>,
    options: ServerOptions,
    clock: Option<Arc<dyn Clock>>,
    debug_sink: Option<DebugSink>,
}

impl OAuth2ServerBuilder {
    /// Sets the persistence adapter (required).
    #[must_use]
    pub fn model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the clock (defaults to the system clock).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the debug sink. Without one, `options.debug` chooses between
    /// [`DebugSink::tracing`] and [`DebugSink::noop`].
    #[must_use]
    pub fn debug_sink(mut self, sink: DebugSink) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Validates the configuration and builds the server.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingModel` if no model was supplied
    /// - any error [`ServerOptions::validate`] reports
    pub fn build(self) -> Result<OAuth2Server, ConfigError> {
        let model = self.model.ok_or(ConfigError::MissingModel)?;
        let debug = self.debug_sink.unwrap_or_else(|| {
            if self.options.debug {
                DebugSink::tracing()
            } else {
                DebugSink::noop()
            }
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let ctx = ConfigurationContext::new(model, self.options, clock, debug)?;
        tracing::debug!(grants = ?ctx.options().grants, "OAuth2 server configured");

        Ok(OAuth2Server { ctx: Arc::new(ctx) })
    }
}
