//! End-to-end token lifecycle against the in-memory model.

mod common;

use std::collections::HashMap;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, LOCATION, PRAGMA};
use axum::http::{Request, StatusCode};
use common::*;
use keyward_auth::prelude::*;
use time::Duration;
use url::Url;

async fn authorize_code(app: &TestApp, user: &str) -> String {
    let request = Request::get(format!(
        "/oauth/authorize?response_type=code&client_id=web-app&redirect_uri={}&state=s1",
        CALLBACK_ENCODED
    ))
    .header("x-user", user)
    .body(Body::empty())
    .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(params["state"], "s1");
    params["code"].clone()
}

fn code_exchange(code: &str) -> Request<Body> {
    token_request(&format!(
        "grant_type=authorization_code&client_id=web-app&client_secret=secret\
         &code={}&redirect_uri={}",
        code, CALLBACK_ENCODED
    ))
}

#[tokio::test]
async fn issued_token_authorizes_as_requester() {
    let app = app(all_grants());
    let token = password_token(&app.router).await;

    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["expires_in"], 3600);
    assert_eq!(token["scope"], "profile");

    let response = send(
        &app.router,
        bearer_get("/me", token["access_token"].as_str().unwrap()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = json_body(response).await;
    assert_eq!(me["client_id"], "web-app");
    assert_eq!(me["owner_id"], "user-alice");
    assert_eq!(me["scope"], "profile");
}

#[tokio::test]
async fn token_response_is_not_cacheable() {
    let app = app(all_grants());
    let response = send(
        &app.router,
        token_request(
            "grant_type=password&client_id=web-app&client_secret=secret\
             &username=alice&password=wonderland",
        ),
    )
    .await;
    assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[PRAGMA], "no-cache");
}

#[tokio::test]
async fn access_token_expires() {
    let app = app(all_grants());
    let token = password_token(&app.router).await;
    let access = token["access_token"].as_str().unwrap().to_string();

    app.clock.advance(Duration::seconds(3599));
    assert_eq!(
        send(&app.router, bearer_get("/me", &access)).await.status(),
        StatusCode::OK
    );

    app.clock.advance(Duration::seconds(2));
    let response = send(&app.router, bearer_get("/me", &access)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let app = app(all_grants());
    let token = password_token(&app.router).await;
    let refresh = token["refresh_token"].as_str().unwrap();
    let body = format!(
        "grant_type=refresh_token&client_id=web-app&client_secret=secret&refresh_token={}",
        refresh
    );

    let rotated = send(&app.router, token_request(&body)).await;
    assert_eq!(rotated.status(), StatusCode::OK);
    let rotated = json_body(rotated).await;
    assert_ne!(rotated["refresh_token"], token["refresh_token"]);
    assert_eq!(rotated["scope"], "profile");

    let replay = send(&app.router, token_request(&body)).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(replay).await["error"], "invalid_grant");
}

#[tokio::test]
async fn client_credentials_with_basic_auth() {
    let app = app(all_grants());
    let request = Request::post("/oauth/token")
        .header("content-type", FORM)
        // svc-1:svc
        .header("authorization", "Basic c3ZjLTE6c3Zj")
        .body(Body::from("grant_type=client_credentials"))
        .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await;
    assert!(token.get("refresh_token").is_none());

    let me = json_body(
        send(
            &app.router,
            bearer_get("/me", token["access_token"].as_str().unwrap()),
        )
        .await,
    )
    .await;
    assert_eq!(me["owner_id"], "svc-1-owner");
}

#[tokio::test]
async fn authorization_code_redeems_once_within_lifetime() {
    let app = app(all_grants());
    let code = authorize_code(&app, "alice").await;

    app.clock.advance(Duration::seconds(29));
    let first = send(&app.router, code_exchange(&code)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let token = json_body(first).await;

    let second = send(&app.router, code_exchange(&code)).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await["error"], "invalid_grant");

    let me = json_body(
        send(
            &app.router,
            bearer_get("/me", token["access_token"].as_str().unwrap()),
        )
        .await,
    )
    .await;
    assert_eq!(me["owner_id"], "alice");
}

#[tokio::test]
async fn authorization_code_expires() {
    let app = app(all_grants());
    let code = authorize_code(&app, "alice").await;

    app.clock.advance(Duration::seconds(31));
    let response = send(&app.router, code_exchange(&code)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn denied_consent_redirects_with_error() {
    let app = app(all_grants());
    let request = Request::get(format!(
        "/oauth/authorize?response_type=code&client_id=web-app&redirect_uri={}&state=s1",
        CALLBACK_ENCODED
    ))
    .body(Body::empty())
    .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(params["error"], "access_denied");
    assert_eq!(params["state"], "s1");
    assert_eq!(app.model.auth_code_count(), 0);
}

#[tokio::test]
async fn unregistered_redirect_uri_is_answered_directly() {
    let app = app(all_grants());
    let request = Request::get(
        "/oauth/authorize?response_type=code&client_id=web-app\
         &redirect_uri=https%3A%2F%2Fevil.example.com%2Fcb",
    )
    .header("x-user", "alice")
    .body(Body::empty())
    .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn unlisted_grant_type_is_rejected() {
    let app = app(ServerOptions::with_grants(["authorization_code", "refresh_token"]));
    let response = send(
        &app.router,
        token_request(
            "grant_type=password&client_id=web-app&client_secret=secret\
             &username=alice&password=wonderland",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "unsupported_grant_type");
    assert_eq!(app.model.access_token_count(), 0);
}

#[tokio::test]
async fn expired_records_are_cleaned_up() {
    let app = app(all_grants());
    password_token(&app.router).await;
    authorize_code(&app, "alice").await;

    app.clock.advance(Duration::hours(2));
    // Access token and code expired; refresh token still live.
    assert_eq!(app.model.cleanup_expired(), 2);
    assert_eq!(app.model.refresh_token_count(), 1);
}

#[tokio::test]
async fn confidential_client_must_send_its_secret() {
    let app = app(all_grants());

    let without = send(
        &app.router,
        token_request("grant_type=client_credentials&client_id=svc-1"),
    )
    .await;
    assert_eq!(without.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(without).await["error"], "invalid_client");

    let empty_basic = Request::post("/oauth/token")
        .header("content-type", FORM)
        // svc-1:
        .header("authorization", "Basic c3ZjLTE6")
        .body(Body::from("grant_type=client_credentials"))
        .unwrap();
    let response = send(&app.router, empty_basic).await;
    assert_eq!(json_body(response).await["error"], "invalid_client");

    assert_eq!(app.model.access_token_count(), 0);
}

#[tokio::test]
async fn code_exchange_requires_client_secret() {
    let app = app(all_grants());
    let code = authorize_code(&app, "alice").await;

    let response = send(
        &app.router,
        token_request(&format!(
            "grant_type=authorization_code&client_id=web-app&code={}&redirect_uri={}",
            code, CALLBACK_ENCODED
        )),
    )
    .await;
    assert_eq!(json_body(response).await["error"], "invalid_client");

    // The code was not spent by the rejected attempt.
    let response = send(&app.router, code_exchange(&code)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_may_narrow_but_not_widen_scope() {
    let app = app(all_grants());
    let token = json_body(
        send(
            &app.router,
            token_request(
                "grant_type=password&client_id=web-app&client_secret=secret\
                 &username=alice&password=wonderland&scope=profile%20email",
            ),
        )
        .await,
    )
    .await;
    let refresh = token["refresh_token"].as_str().unwrap();
    let with_scope = |scope: &str| {
        token_request(&format!(
            "grant_type=refresh_token&client_id=web-app&client_secret=secret\
             &refresh_token={}&scope={}",
            refresh, scope
        ))
    };

    let widened = send(&app.router, with_scope("admin%20everything")).await;
    assert_eq!(widened.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(widened).await["error"], "invalid_scope");
    assert_eq!(app.model.refresh_token_count(), 1);

    let narrowed = send(&app.router, with_scope("email")).await;
    assert_eq!(narrowed.status(), StatusCode::OK);
    let narrowed = json_body(narrowed).await;
    assert_eq!(narrowed["scope"], "email");

    let me = json_body(
        send(
            &app.router,
            bearer_get("/me", narrowed["access_token"].as_str().unwrap()),
        )
        .await,
    )
    .await;
    assert_eq!(me["scope"], "email");
}
