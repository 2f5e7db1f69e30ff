//! Route tagging for `check_authorize`, and the `bypass` sentinel.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use tower::{Layer, Service};

/// Marker attached to a route by [`OAuth2Server::tag_route`](crate::OAuth2Server::tag_route).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTag(Arc<str>);

impl RouteTag {
    /// Creates a tag.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The tag name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RouteTag {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// Request extension listing the tags of the matched route.
#[derive(Debug, Clone, Default)]
pub struct RouteTags(Vec<RouteTag>);

impl RouteTags {
    /// Returns `true` if the route carries `tag`.
    pub fn contains(&self, tag: &RouteTag) -> bool {
        self.0.contains(tag)
    }
}

/// Layer adding a [`RouteTag`] to every request it sees.
///
/// Must wrap (be applied after) the `check_authorize` layer that reads it.
#[derive(Debug, Clone)]
pub struct TagRouteLayer {
    tag: RouteTag,
}

impl TagRouteLayer {
    pub(crate) fn new(tag: RouteTag) -> Self {
        Self { tag }
    }
}

impl<S> Layer<S> for TagRouteLayer {
    type Service = TagRouteService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TagRouteService {
            inner,
            tag: self.tag.clone(),
        }
    }
}

/// Service produced by [`TagRouteLayer`].
#[derive(Debug, Clone)]
pub struct TagRouteService<S> {
    inner: S,
    tag: RouteTag,
}

impl<S> Service<Request> for TagRouteService<S>
where
    S: Service<Request>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let extensions = request.extensions_mut();
        match extensions.get_mut::<RouteTags>() {
            Some(tags) => tags.0.push(self.tag.clone()),
            None => {
                extensions.insert(RouteTags(vec![self.tag.clone()]));
            }
        }
        self.inner.call(request)
    }
}

/// Pass-through layer marking a route as exempt from OAuth handling.
///
/// Wrapping a service with `Bypass` returns the service unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bypass;

impl<S> Layer<S> for Bypass {
    type Service = S;

    fn layer(&self, inner: S) -> Self::Service {
        inner
    }
}
