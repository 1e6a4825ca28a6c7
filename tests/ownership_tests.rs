// SPDX-License-Identifier: MIT

//! Ownership-scoped data store tests through the full router.
//!
//! Cover ownership spoofing, cross-user mutation attempts, profile
//! uniqueness, and the public read paths.

use axum::http::{Method, StatusCode};

mod common;
use common::*;

fn soup_json() -> serde_json::Value {
    serde_json::json!({
        "title": "Soup",
        "ingredients": "water",
        "instructions": "boil",
        "category": "dinner"
    })
}

async fn create_recipe(app: &TestApp, cookies: &str, body: &serde_json::Value) -> serde_json::Value {
    let response = send(
        app,
        json_request(Method::POST, "/api/recipes", Some(cookies), body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_create_recipe_requires_authentication() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request(Method::POST, "/api/recipes", None, &soup_json()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_spoofed_user_id_is_ignored() {
    let app = create_test_app();
    let (cookies, user_id) = sign_up(&app, "a@x.com", "pw123456").await;

    let mut body = soup_json();
    body["user_id"] = serde_json::json!("someone-else");
    let recipe = create_recipe(&app, &cookies, &body).await;

    // The spoof is dropped, not rejected: the record belongs to the actor.
    assert_eq!(recipe["user_id"], user_id.as_str());
}

#[tokio::test]
async fn test_missing_required_fields_rejected() {
    let app = create_test_app();
    let (cookies, _) = sign_up(&app, "a@x.com", "pw123456").await;

    let mut body = soup_json();
    body["ingredients"] = serde_json::json!("   ");
    let response = send(
        &app,
        json_request(Method::POST, "/api/recipes", Some(&cookies), &body),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_str().unwrap().contains("ingredients"));
}

#[tokio::test]
async fn test_update_by_non_owner_forbidden_and_unchanged() {
    let app = create_test_app();
    let (owner_cookies, _) = sign_up(&app, "a@x.com", "pw123456").await;
    let (other_cookies, _) = sign_up(&app, "b@x.com", "pw123456").await;

    let recipe = create_recipe(&app, &owner_cookies, &soup_json()).await;
    let recipe_id = recipe["id"].as_str().unwrap();

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/recipes/{recipe_id}"),
            Some(&other_cookies),
            &serde_json::json!({ "title": "Hijacked" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The body stays generic: nothing about the record leaks.
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
    assert!(body.get("details").is_none());

    let unchanged = body_json(
        send(
            &app,
            request(Method::GET, &format!("/api/recipes/{recipe_id}"), None),
        )
        .await,
    )
    .await;
    assert_eq!(unchanged["title"], "Soup");
}

#[tokio::test]
async fn test_owner_can_update() {
    let app = create_test_app();
    let (cookies, user_id) = sign_up(&app, "a@x.com", "pw123456").await;

    let recipe = create_recipe(&app, &cookies, &soup_json()).await;
    let recipe_id = recipe["id"].as_str().unwrap();

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/recipes/{recipe_id}"),
            Some(&cookies),
            &serde_json::json!({ "title": "Better Soup", "cooking_time": 45 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["title"], "Better Soup");
    assert_eq!(body["cooking_time"], 45);
    assert_eq!(body["user_id"], user_id.as_str());
}

#[tokio::test]
async fn test_delete_by_non_owner_forbidden() {
    let app = create_test_app();
    let (owner_cookies, _) = sign_up(&app, "a@x.com", "pw123456").await;
    let (other_cookies, _) = sign_up(&app, "b@x.com", "pw123456").await;

    let recipe = create_recipe(&app, &owner_cookies, &soup_json()).await;
    let recipe_id = recipe["id"].as_str().unwrap();

    let response = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/recipes/{recipe_id}"),
            Some(&other_cookies),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Still there for the owner
    let response = send(
        &app,
        request(Method::GET, &format!("/api/recipes/{recipe_id}"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_owner_can_delete() {
    let app = create_test_app();
    let (cookies, _) = sign_up(&app, "a@x.com", "pw123456").await;

    let recipe = create_recipe(&app, &cookies, &soup_json()).await;
    let recipe_id = recipe["id"].as_str().unwrap();

    let response = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/recipes/{recipe_id}"),
            Some(&cookies),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        request(Method::GET, &format!("/api/recipes/{recipe_id}"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_creation_is_conflict_safe() {
    let app = create_test_app();
    let (cookies, user_id) = sign_up(&app, "a@x.com", "pw123456").await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile",
            Some(&cookies),
            &serde_json::json!({ "username": "alice", "full_name": "Alice" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile = body_json(response).await;
    assert_eq!(profile["id"], user_id.as_str());
    assert_eq!(profile["username"], "alice");

    // Second creation for the same identity fails and changes nothing.
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile",
            Some(&cookies),
            &serde_json::json!({ "username": "alice-two" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let me = body_json(send(&app, request(Method::GET, "/api/me", Some(&cookies))).await).await;
    assert_eq!(me["profile"]["username"], "alice");
}

#[tokio::test]
async fn test_username_collision_conflicts() {
    let app = create_test_app();
    let (alice_cookies, _) = sign_up(&app, "a@x.com", "pw123456").await;
    let (bob_cookies, _) = sign_up(&app, "b@x.com", "pw123456").await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile",
            Some(&alice_cookies),
            &serde_json::json!({ "username": "cook" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/profile",
            Some(&bob_cookies),
            &serde_json::json!({ "username": "cook" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = create_test_app();
    let (cookies, user_id) = sign_up(&app, "a@x.com", "pw123456").await;

    send(
        &app,
        json_request(
            Method::POST,
            "/api/profile",
            Some(&cookies),
            &serde_json::json!({ "username": "alice" }),
        ),
    )
    .await;
    create_recipe(&app, &cookies, &soup_json()).await;

    // All without cookies
    let list = body_json(send(&app, request(Method::GET, "/api/recipes", None)).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let filtered = body_json(
        send(
            &app,
            request(
                Method::GET,
                &format!("/api/recipes?user_id={user_id}&category=dinner"),
                None,
            ),
        )
        .await,
    )
    .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let profile = send(
        &app,
        request(Method::GET, &format!("/api/profiles/{user_id}"), None),
    )
    .await;
    assert_eq!(profile.status(), StatusCode::OK);

    let by_username = send(
        &app,
        request(Method::GET, "/api/profiles/username/alice", None),
    )
    .await;
    assert_eq!(by_username.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = create_test_app();

    let response = send(&app, request(Method::GET, "/api/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// The full scenario: sign up, create profile and recipe, then fail to
/// delete the recipe as a different identity.
#[tokio::test]
async fn test_end_to_end_ownership_scenario() {
    let app = create_test_app();

    let (alice_cookies, alice_id) = sign_up(&app, "a@x.com", "pw123456").await;

    let profile = body_json(
        send(
            &app,
            json_request(
                Method::POST,
                "/api/profile",
                Some(&alice_cookies),
                &serde_json::json!({ "username": "alice" }),
            ),
        )
        .await,
    )
    .await;
    assert_eq!(profile["id"], alice_id.as_str());
    assert_eq!(profile["username"], "alice");

    let recipe = create_recipe(&app, &alice_cookies, &soup_json()).await;
    assert_eq!(recipe["user_id"], alice_id.as_str());

    let (mallory_cookies, _) = sign_up(&app, "m@x.com", "pw123456").await;
    let response = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/recipes/{}", recipe["id"].as_str().unwrap()),
            Some(&mallory_cookies),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
