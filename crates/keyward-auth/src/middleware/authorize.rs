//! Bearer authorization middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::http::request::Parts;

use super::layer::{FlowOutcome, MAX_FORM_BODY, RequestFlow, read_form_body, reject};
use super::route::{RouteTag, RouteTags};
use crate::context::ConfigurationContext;
use crate::flows::{AuthorizedToken, TokenAuthorizationFlow, is_form_post};

/// Runs [`TokenAuthorizationFlow`], optionally only on tagged routes.
pub struct Authorize {
    flow: TokenAuthorizationFlow,
    ctx: Arc<ConfigurationContext>,
    only_tagged: Option<RouteTag>,
}

impl Authorize {
    pub(crate) fn new(ctx: Arc<ConfigurationContext>, only_tagged: Option<RouteTag>) -> Self {
        Self {
            flow: TokenAuthorizationFlow::new(ctx.clone()),
            ctx,
            only_tagged,
        }
    }
}

#[async_trait]
impl RequestFlow for Authorize {
    async fn run(&self, request: Request) -> FlowOutcome {
        if let Some(tag) = &self.only_tagged {
            let tagged = request
                .extensions()
                .get::<RouteTags>()
                .is_some_and(|tags| tags.contains(tag));
            if !tagged {
                return FlowOutcome::Proceed(request);
            }
        }

        let (mut parts, body) = request.into_parts();
        let (form, body) = if inspect_body(&parts) {
            match read_form_body(body).await {
                Ok(bytes) => (Some(bytes.clone()), Body::from(bytes)),
                Err(err) => return reject(&self.ctx, parts, err),
            }
        } else {
            (None, body)
        };

        match self.flow.authorize(&parts, form.as_deref()).await {
            Ok(token) => {
                parts.extensions.insert(AuthorizedToken(token));
                FlowOutcome::Proceed(Request::from_parts(parts, body))
            }
            Err(err) => reject(&self.ctx, parts, err),
        }
    }
}

/// Whether the form body must be buffered to look for an `access_token`.
///
/// When the header or query already carries a token, a body larger than
/// [`MAX_FORM_BODY`] (or of unknown length) is streamed to the handler
/// untouched instead of being rejected.
fn inspect_body(parts: &Parts) -> bool {
    if !is_form_post(parts) {
        return false;
    }
    let token_elsewhere = parts.headers.contains_key(AUTHORIZATION)
        || parts.uri.query().is_some_and(|query| {
            url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "access_token")
        });
    if !token_elsewhere {
        return true;
    }
    parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
        .is_some_and(|length| length <= MAX_FORM_BODY)
}
