// SPDX-License-Identifier: MIT

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use recipe_share::config::Config;
use recipe_share::provider::{AuthClient, InMemoryAuth, RecordClient};
use recipe_share::routes::create_router;
use recipe_share::store::ContentStore;
use recipe_share::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Test app over the in-memory provider modes.
pub struct TestApp {
    pub router: Router,
    /// Handle into the in-memory identity provider (refresh counters,
    /// failure toggles, token TTL).
    pub auth: Arc<InMemoryAuth>,
}

/// Create a test app with in-memory provider backends.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let auth_state = InMemoryAuth::new(config.provider_jwt_secret.clone());

    let auth = AuthClient::in_memory(auth_state.clone());
    let store = ContentStore::new(RecordClient::in_memory());

    let state = Arc::new(AppState {
        config,
        auth,
        store,
    });

    TestApp {
        router: create_router(state),
        auth: auth_state,
    }
}

/// Send one request through a fresh clone of the router.
#[allow(dead_code)]
pub async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

/// Build a JSON request, optionally with a Cookie header.
#[allow(dead_code)]
pub fn json_request(
    method: Method,
    uri: &str,
    cookies: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodyless request, optionally with a Cookie header.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

/// Parse a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie headers on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The Set-Cookie header for one cookie name.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Fold a response's Set-Cookie headers into a Cookie request header.
#[allow(dead_code)]
pub fn cookie_header(response: &Response) -> String {
    set_cookie_headers(response)
        .iter()
        .map(|set_cookie| set_cookie.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sign up an account; returns (cookie header, user id).
#[allow(dead_code)]
pub async fn sign_up(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/auth/signup",
            None,
            &serde_json::json!({ "email": email, "password": password }),
        ),
    )
    .await;

    assert_eq!(
        response.status(),
        axum::http::StatusCode::CREATED,
        "sign-up should succeed for {email}"
    );

    let cookies = cookie_header(&response);
    let body = body_json(response).await;
    let user_id = body["id"].as_str().unwrap().to_string();
    (cookies, user_id)
}
