//! Authorization endpoint middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;

use super::layer::{FlowOutcome, RequestFlow, read_form_body, reject};
use super::response::redirect_response;
use crate::context::ConfigurationContext;
use crate::flows::{AuthorizationCodeFlow, ConsentChecker, is_form_post};

/// Runs [`AuthorizationCodeFlow`] and answers with a redirect or an error.
pub struct AuthCodeGrant {
    flow: AuthorizationCodeFlow,
    ctx: Arc<ConfigurationContext>,
}

impl AuthCodeGrant {
    pub(crate) fn new(ctx: Arc<ConfigurationContext>, check: Arc<dyn ConsentChecker>) -> Self {
        Self {
            flow: AuthorizationCodeFlow::new(ctx.clone(), check),
            ctx,
        }
    }
}

#[async_trait]
impl RequestFlow for AuthCodeGrant {
    async fn run(&self, request: Request) -> FlowOutcome {
        let (parts, body) = request.into_parts();
        let form = if is_form_post(&parts) {
            match read_form_body(body).await {
                Ok(bytes) => Some(bytes),
                Err(err) => return reject(&self.ctx, parts, err),
            }
        } else {
            None
        };

        match self.flow.handle(&parts, form.as_deref()).await {
            Ok(location) => FlowOutcome::Respond {
                response: redirect_response(&location),
                parts,
            },
            Err(err) => reject(&self.ctx, parts, err),
        }
    }
}
