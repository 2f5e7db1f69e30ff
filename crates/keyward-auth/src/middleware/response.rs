//! Rendering flow results as HTTP responses.

use std::sync::Arc;

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use url::Url;

use crate::context::ConfigurationContext;
use crate::error::{AuthError, ErrorCategory};
use crate::oauth::TokenResponse;

const REALM: &str = "Service";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.oauth_error_code();
        let description = self.description();

        let body = json!({
            "code": status.as_u16(),
            "error": error,
            "error_description": description,
        });

        let mut headers = no_store_headers();
        if status == StatusCode::UNAUTHORIZED {
            // Missing credentials get a bare challenge (RFC 6750 §3.1).
            let challenge = match self {
                AuthError::Unauthorized { .. } => format!("Bearer realm=\"{}\"", REALM),
                _ => build_www_authenticate_header(error, &description),
            };
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, no_store_headers(), Json(self)).into_response()
    }
}

/// Response extension carrying an adapter error the host should handle.
///
/// Attached to a bare `500` response when `passthrough_errors` is enabled,
/// so an outer layer (e.g. `axum::middleware::map_response`) can map it
/// with the application's own error handling.
#[derive(Debug, Clone)]
pub struct PassthroughError(pub Arc<AuthError>);

/// Renders an error, honouring `passthrough_errors` for adapter failures.
pub fn error_response(ctx: &ConfigurationContext, err: AuthError) -> Response {
    if err.category() == ErrorCategory::Adapter {
        tracing::error!(error = %err, "Model failure");
        if ctx.options().passthrough_errors {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            response
                .extensions_mut()
                .insert(PassthroughError(Arc::new(err)));
            return response;
        }
    } else {
        tracing::debug!(error = %err, "OAuth request rejected");
    }
    err.into_response()
}

/// 302 redirect to `location`.
pub fn redirect_response(location: &Url) -> Response {
    let mut headers = no_store_headers();
    if let Ok(value) = HeaderValue::from_str(location.as_str()) {
        headers.insert(header::LOCATION, value);
    }
    (StatusCode::FOUND, headers).into_response()
}

fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Format: `Bearer realm="Service", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('"', "\\\"");
    format!(
        "Bearer realm=\"{}\", error=\"{}\", error_description=\"{}\"",
        REALM, error, escaped_desc
    )
}
