//! Tower plumbing shared by the OAuth middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::request::Parts;
use axum::response::Response;
use tower::{Layer, Service};

use crate::AuthResult;
use crate::context::ConfigurationContext;
use crate::error::AuthError;

/// Largest form body the middleware will buffer.
pub const MAX_FORM_BODY: usize = 64 * 1024;

/// What a flow decided for one request.
pub enum FlowOutcome {
    /// Hand the (possibly annotated) request to the inner service.
    Proceed(Request),
    /// The flow answered the request itself.
    Respond {
        /// Request head, kept for `continue_after_response`.
        parts: Parts,
        /// The response to send.
        response: Response,
    },
}

/// A request-handling step that either forwards a request or answers it.
#[async_trait]
pub trait RequestFlow: Send + Sync + 'static {
    /// Runs the step.
    async fn run(&self, request: Request) -> FlowOutcome;
}

/// Layer wrapping services with a [`RequestFlow`].
pub struct OAuthLayer<F> {
    flow: Arc<F>,
    ctx: Arc<ConfigurationContext>,
}

impl<F> OAuthLayer<F> {
    pub(crate) fn new(flow: F, ctx: Arc<ConfigurationContext>) -> Self {
        Self {
            flow: Arc::new(flow),
            ctx,
        }
    }
}

impl<F> Clone for OAuthLayer<F> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<S, F> Layer<S> for OAuthLayer<F> {
    type Service = OAuthService<S, F>;

    fn layer(&self, inner: S) -> Self::Service {
        OAuthService {
            inner,
            flow: self.flow.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

/// Service produced by [`OAuthLayer`].
pub struct OAuthService<S, F> {
    inner: S,
    flow: Arc<F>,
    ctx: Arc<ConfigurationContext>,
}

impl<S: Clone, F> Clone for OAuthService<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            flow: self.flow.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<S, F> Service<Request> for OAuthService<S, F>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: std::fmt::Display,
    S::Future: Send + 'static,
    F: RequestFlow,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let flow = self.flow.clone();
        let continue_after_response = self.ctx.options().continue_after_response;

        Box::pin(async move {
            match flow.run(request).await {
                FlowOutcome::Proceed(request) => inner.call(request).await,
                FlowOutcome::Respond { parts, response } => {
                    if continue_after_response {
                        // The inner response is discarded; only its side effects matter.
                        if let Err(err) = inner.call(Request::from_parts(parts, Body::empty())).await
                        {
                            tracing::debug!(error = %err, "Inner service failed after response");
                        }
                    }
                    Ok(response)
                }
            }
        })
    }
}

/// Buffers a form-urlencoded body.
pub(crate) async fn read_form_body(body: Body) -> AuthResult<Bytes> {
    axum::body::to_bytes(body, MAX_FORM_BODY)
        .await
        .map_err(|_| AuthError::invalid_request("Request body is too large or unreadable"))
}

/// Answers a request with an error response.
pub(crate) fn reject(ctx: &ConfigurationContext, parts: Parts, err: AuthError) -> FlowOutcome {
    FlowOutcome::Respond {
        parts,
        response: super::response::error_response(ctx, err),
    }
}
