#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use keyward_auth::prelude::*;
use keyward_auth_memory::MemoryModel;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::datetime;
use tower::{ServiceBuilder, ServiceExt};

pub const FORM: &str = "application/x-www-form-urlencoded";
pub const CALLBACK: &str = "https://app.example.com/cb";
pub const CALLBACK_ENCODED: &str = "https%3A%2F%2Fapp.example.com%2Fcb";
pub const START: OffsetDateTime = datetime!(2024-01-01 12:00 UTC);

pub struct TestApp {
    pub router: Router,
    pub server: OAuth2Server,
    pub model: Arc<MemoryModel>,
    pub clock: Arc<ManualClock>,
}

pub fn memory_model(clock: Arc<ManualClock>) -> MemoryModel {
    let model = MemoryModel::with_clock(clock);
    model.add_client(
        Client::new("web-app").with_redirect_uri(CALLBACK),
        Some("secret"),
    );
    model.add_client(Client::new("svc-1").with_owner("svc-1-owner"), Some("svc"));
    model
        .add_user("alice", "wonderland", User::new("user-alice"))
        .unwrap();
    model
}

pub fn app(options: ServerOptions) -> TestApp {
    let clock = Arc::new(ManualClock::new(START));
    let model = Arc::new(memory_model(clock.clone()));
    let server = OAuth2Server::builder()
        .model(model.clone())
        .options(options)
        .clock(clock.clone())
        .build()
        .unwrap();

    TestApp {
        router: router(&server),
        server,
        model,
        clock,
    }
}

pub fn all_grants() -> ServerOptions {
    ServerOptions::with_grants([
        "authorization_code",
        "password",
        "client_credentials",
        "refresh_token",
    ])
}

/// Consent is granted to whoever the `x-user` header names.
pub fn consent_from_header(parts: &Parts) -> Consent {
    parts
        .headers
        .get("x-user")
        .and_then(|value| value.to_str().ok())
        .map(Consent::granted)
        .unwrap_or(Consent::Denied)
}

pub fn router(server: &OAuth2Server) -> Router {
    Router::new()
        .route("/oauth/token", post(unreachable).layer(server.grant()))
        .route(
            "/oauth/authorize",
            get(unreachable)
                .post(unreachable)
                .layer(server.auth_code_grant(consent_from_header)),
        )
        .route("/me", get(me).post(me).layer(server.authorize()))
        .route(
            "/tagged",
            // The tag must wrap the check that reads it.
            get(open).layer(
                ServiceBuilder::new()
                    .layer(server.tag_route("secure"))
                    .layer(server.check_authorize("secure")),
            ),
        )
        .route("/untagged", get(open).layer(server.check_authorize("secure")))
        .route("/public", get(open).layer(server.bypass()))
}

async fn unreachable() -> &'static str {
    "inner handler"
}

async fn open() -> &'static str {
    "open"
}

async fn me(Extension(token): Extension<AuthorizedToken>, body: String) -> Json<Value> {
    Json(json!({
        "client_id": token.client_id(),
        "owner_id": token.owner_id(),
        "scope": token.scope(),
        "body": body,
    }))
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn token_request(body: &str) -> Request<Body> {
    Request::post("/oauth/token")
        .header(CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_get(path: &str, token: &str) -> Request<Body> {
    Request::get(path)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn password_token(router: &Router) -> Value {
    let response = send(
        router,
        token_request(
            "grant_type=password&client_id=web-app&client_secret=secret\
             &username=alice&password=wonderland&scope=profile",
        ),
    )
    .await;
    assert_eq!(response.status(), 200);
    json_body(response).await
}
