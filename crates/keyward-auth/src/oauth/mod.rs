//! OAuth 2.0 wire types: token and authorization requests, token responses
//! and credential parsing.

pub mod authorize;
pub mod credentials;
pub mod token;

pub use authorize::AuthorizationRequest;
pub use credentials::{ClientCredentials, is_token68, parse_basic_auth};
pub use token::{TokenRequest, TokenResponse};
