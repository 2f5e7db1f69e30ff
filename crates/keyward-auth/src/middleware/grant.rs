//! Token endpoint middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Request;
use axum::response::IntoResponse;

use super::layer::{FlowOutcome, RequestFlow, read_form_body, reject};
use crate::context::ConfigurationContext;
use crate::flows::{GrantIssuanceFlow, is_form_post};

/// Runs [`GrantIssuanceFlow`] and answers with the token response.
pub struct Grant {
    flow: GrantIssuanceFlow,
    ctx: Arc<ConfigurationContext>,
}

impl Grant {
    pub(crate) fn new(ctx: Arc<ConfigurationContext>) -> Self {
        Self {
            flow: GrantIssuanceFlow::new(ctx.clone()),
            ctx,
        }
    }
}

#[async_trait]
impl RequestFlow for Grant {
    async fn run(&self, request: Request) -> FlowOutcome {
        let (parts, body) = request.into_parts();
        let body = if is_form_post(&parts) {
            match read_form_body(body).await {
                Ok(bytes) => bytes,
                Err(err) => return reject(&self.ctx, parts, err),
            }
        } else {
            Bytes::new()
        };

        match self.flow.issue(&parts, &body).await {
            Ok(token) => FlowOutcome::Respond {
                parts,
                response: token.into_response(),
            },
            Err(err) => reject(&self.ctx, parts, err),
        }
    }
}
