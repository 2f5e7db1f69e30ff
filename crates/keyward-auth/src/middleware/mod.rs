//! axum/tower middleware produced by [`OAuth2Server`](crate::OAuth2Server).
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::{get, post}};
//!
//! let app = Router::new()
//!     .route("/oauth/token", post(|| async {}).layer(server.grant()))
//!     .route("/oauth/authorize", get(|| async {}).layer(server.auth_code_grant(check)))
//!     .route("/me", get(me).layer(server.authorize()));
//! ```

pub mod auth_code;
pub mod authorize;
pub mod grant;
pub mod layer;
pub mod response;
pub mod route;

pub use auth_code::AuthCodeGrant;
pub use authorize::Authorize;
pub use grant::Grant;
pub use layer::{FlowOutcome, MAX_FORM_BODY, OAuthLayer, OAuthService, RequestFlow};
pub use response::{PassthroughError, error_response, redirect_response};
pub use route::{Bypass, RouteTag, RouteTags, TagRouteLayer, TagRouteService};
