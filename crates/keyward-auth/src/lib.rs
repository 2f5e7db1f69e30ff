//! # keyward-auth
//!
//! OAuth 2.0 authorization server middleware for axum.
//!
//! This crate provides:
//! - Server-wide configuration with validation at construction time
//! - Client identifier and grant type checks run before any storage access
//! - Bearer token authorization (RFC 6750)
//! - The token endpoint: authorization_code, password, client_credentials,
//!   refresh_token and extension grants (RFC 6749)
//! - The interactive authorization code step with a pluggable consent check
//!
//! Storage is abstracted behind the [`Model`] trait; see the
//! `keyward-auth-memory` crate for an in-memory implementation.
//!
//! ## Modules
//!
//! - [`config`] - Server options and debug sink
//! - [`context`] - Shared, validated configuration
//! - [`validation`] - Client identifier and grant type checks
//! - [`flows`] - Bearer authorization, token issuance and authorization code flows
//! - [`middleware`] - tower layers wrapping the flows
//! - [`model`] - Persistence adapter trait
//! - [`oauth`] - OAuth 2.0 request and response types
//! - [`server`] - The [`OAuth2Server`] orchestrator

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod flows;
pub mod middleware;
pub mod model;
pub mod oauth;
pub mod server;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DebugSink, ServerOptions};
pub use context::ConfigurationContext;
pub use error::{AuthError, ErrorCategory};
pub use flows::{
    AuthorizationCodeFlow, AuthorizedToken, Consent, ConsentChecker, GrantIssuanceFlow,
    TokenAuthorizationFlow,
};
pub use middleware::{Bypass, PassthroughError, RouteTag};
pub use model::Model;
pub use oauth::{TokenRequest, TokenResponse};
pub use server::{OAuth2Server, OAuth2ServerBuilder};
pub use types::{AccessToken, AuthCode, Client, GrantType, RefreshToken, TokenKind, User};
pub use validation::{ClientIdValidator, GrantTypeWhitelist};

/// Type alias for authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use keyward_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{ConfigError, DebugSink, ServerOptions};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::flows::{AuthorizedToken, Consent, ConsentChecker};
    pub use crate::middleware::{Bypass, PassthroughError, RouteTag};
    pub use crate::model::Model;
    pub use crate::oauth::{TokenRequest, TokenResponse};
    pub use crate::server::{OAuth2Server, OAuth2ServerBuilder};
    pub use crate::types::{AccessToken, AuthCode, Client, GrantType, RefreshToken, TokenKind, User};
}
