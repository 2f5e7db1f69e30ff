//! Domain types shared by the flows and the model.

pub mod client;
pub mod grant;
pub mod token;

pub use client::{Client, User};
pub use grant::GrantType;
pub use token::{AccessToken, AuthCode, RefreshToken, TokenKind, generate_token};
