//! Social Graph Tests
//!
//! Covers the follow state machine: direct follows of public accounts,
//! pending requests for private accounts, accept/decline, and the invariant
//! that an edge and a request never coexist.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

async fn pair_state(app: &common::TestApp, requester: Uuid, target: Uuid) -> (bool, bool) {
    let edge: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
    )
    .bind(requester)
    .bind(target)
    .fetch_one(app.pool())
    .await
    .unwrap();
    let request: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM follow_requests WHERE requester_id = $1 AND target_id = $2)",
    )
    .bind(requester)
    .bind(target)
    .fetch_one(app.pool())
    .await
    .unwrap();
    (edge, request)
}

// ===========================================================================
// Following public accounts
// ===========================================================================

#[tokio::test]
async fn follow_public_user_is_immediate() {
    let app = app().await;
    let user_a = app.create_user("soc_pub_a").await;
    let user_b = app.create_user("soc_pub_b").await;

    let resp = app
        .post_json(
            &format!("/follow/{}", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "following");

    let (edge, request) = pair_state(app, user_a.id, user_b.id).await;
    assert!(edge);
    assert!(!request);
}

#[tokio::test]
async fn follow_public_user_is_idempotent() {
    let app = app().await;
    let user_a = app.create_user("soc_pub_dup_a").await;
    let user_b = app.create_user("soc_pub_dup_b").await;

    for _ in 0..2 {
        let resp = app
            .post_json(
                &format!("/follow/{}", user_b.id),
                json!({}),
                Some(&user_a.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json()["status"].as_str().unwrap(), "following");
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND followee_id = $2",
    )
    .bind(user_a.id)
    .bind(user_b.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn follow_self_is_rejected() {
    let app = app().await;
    let user = app.create_user("soc_self").await;

    let resp = app
        .post_json(
            &format!("/follow/{}", user.id),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "cannot follow yourself");
}

#[tokio::test]
async fn follow_nonexistent_user() {
    let app = app().await;
    let user = app.create_user("soc_ghost").await;

    let resp = app
        .post_json(
            &format!("/follow/{}", Uuid::new_v4()),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Private accounts: request, accept, decline
// ===========================================================================

#[tokio::test]
async fn follow_private_user_goes_pending() {
    let app = app().await;
    let requester = app.create_user("soc_priv_req").await;
    let target = app.create_private_user("soc_priv_tgt").await;

    let resp = app
        .post_json(
            &format!("/follow/{}", target.id),
            json!({}),
            Some(&requester.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "pending");

    // Edge and request never coexist: pending means request only.
    let (edge, request) = pair_state(app, requester.id, target.id).await;
    assert!(!edge);
    assert!(request);
}

#[tokio::test]
async fn accept_request_converts_to_edge_atomically() {
    let app = app().await;
    let requester = app.create_user("soc_accept_req").await;
    let target = app.create_private_user("soc_accept_tgt").await;

    app.post_json(
        &format!("/follow/{}", target.id),
        json!({}),
        Some(&requester.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/follow-requests/{}/accept", requester.id),
            json!({}),
            Some(&target.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    // Exactly one edge, zero requests.
    let (edge, request) = pair_state(app, requester.id, target.id).await;
    assert!(edge);
    assert!(!request);
}

#[tokio::test]
async fn accept_without_pending_request_is_not_found() {
    let app = app().await;
    let requester = app.create_user("soc_accept_none_req").await;
    let target = app.create_private_user("soc_accept_none_tgt").await;

    let resp = app
        .post_json(
            &format!("/follow-requests/{}/accept", requester.id),
            json!({}),
            Some(&target.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // Nothing was created half-way.
    let (edge, request) = pair_state(app, requester.id, target.id).await;
    assert!(!edge);
    assert!(!request);
}

#[tokio::test]
async fn decline_request_removes_it_without_edge() {
    let app = app().await;
    let requester = app.create_user("soc_decline_req").await;
    let target = app.create_private_user("soc_decline_tgt").await;

    app.post_json(
        &format!("/follow/{}", target.id),
        json!({}),
        Some(&requester.access_token),
    )
    .await;

    let resp = app
        .delete(
            &format!("/follow-requests/{}/decline", requester.id),
            Some(&target.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let (edge, request) = pair_state(app, requester.id, target.id).await;
    assert!(!edge);
    assert!(!request);
}

#[tokio::test]
async fn repeated_private_follow_stays_pending() {
    let app = app().await;
    let requester = app.create_user("soc_pend_dup_req").await;
    let target = app.create_private_user("soc_pend_dup_tgt").await;

    for _ in 0..2 {
        let resp = app
            .post_json(
                &format!("/follow/{}", target.id),
                json!({}),
                Some(&requester.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::ACCEPTED);
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follow_requests WHERE requester_id = $1 AND target_id = $2",
    )
    .bind(requester.id)
    .bind(target.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn follow_after_accept_reports_following_without_new_request() {
    let app = app().await;
    let requester = app.create_user("soc_refollow_req").await;
    let target = app.create_private_user("soc_refollow_tgt").await;

    app.post_json(
        &format!("/follow/{}", target.id),
        json!({}),
        Some(&requester.access_token),
    )
    .await;
    app.post_json(
        &format!("/follow-requests/{}/accept", requester.id),
        json!({}),
        Some(&target.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/follow/{}", target.id),
            json!({}),
            Some(&requester.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"].as_str().unwrap(), "following");

    let (edge, request) = pair_state(app, requester.id, target.id).await;
    assert!(edge);
    assert!(!request);
}

#[tokio::test]
async fn list_follow_requests_shows_requesters() {
    let app = app().await;
    let requester = app.create_user("soc_list_req").await;
    let target = app.create_private_user("soc_list_tgt").await;

    app.post_json(
        &format!("/follow/{}", target.id),
        json!({}),
        Some(&requester.access_token),
    )
    .await;

    let resp = app.get("/follow-requests", Some(&target.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["username"].as_str().unwrap(), requester.username);
}

// ===========================================================================
// Unfollow & relationship
// ===========================================================================

#[tokio::test]
async fn unfollow_removes_edge() {
    let app = app().await;
    let user_a = app.create_user("soc_unfollow_a").await;
    let user_b = app.create_user("soc_unfollow_b").await;

    app.post_json(
        &format!("/follow/{}", user_b.id),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/unfollow/{}", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unfollowed"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn unfollow_when_not_following_is_a_noop() {
    let app = app().await;
    let user_a = app.create_user("soc_unfollow_none_a").await;
    let user_b = app.create_user("soc_unfollow_none_b").await;

    let resp = app
        .post_json(
            &format!("/unfollow/{}", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unfollowed"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn relationship_reflects_pending_and_following() {
    let app = app().await;
    let viewer = app.create_user("soc_rel_viewer").await;
    let target = app.create_private_user("soc_rel_target").await;

    let resp = app
        .get(
            &format!("/users/{}/relationship", target.id),
            Some(&viewer.access_token),
        )
        .await;
    let body = resp.json();
    assert_eq!(body["is_following"].as_bool().unwrap(), false);
    assert_eq!(body["is_pending"].as_bool().unwrap(), false);

    app.post_json(
        &format!("/follow/{}", target.id),
        json!({}),
        Some(&viewer.access_token),
    )
    .await;

    let resp = app
        .get(
            &format!("/users/{}/relationship", target.id),
            Some(&viewer.access_token),
        )
        .await;
    let body = resp.json();
    assert_eq!(body["is_following"].as_bool().unwrap(), false);
    assert_eq!(body["is_pending"].as_bool().unwrap(), true);

    app.post_json(
        &format!("/follow-requests/{}/accept", viewer.id),
        json!({}),
        Some(&target.access_token),
    )
    .await;

    let resp = app
        .get(
            &format!("/users/{}/relationship", target.id),
            Some(&viewer.access_token),
        )
        .await;
    let body = resp.json();
    assert_eq!(body["is_following"].as_bool().unwrap(), true);
    assert_eq!(body["is_pending"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn followers_and_following_lists() {
    let app = app().await;
    let user_a = app.create_user("soc_lists_a").await;
    let user_b = app.create_user("soc_lists_b").await;

    app.post_json(
        &format!("/follow/{}", user_b.id),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .get(
            &format!("/users/{}/followers", user_b.id),
            Some(&user_a.access_token),
        )
        .await;
    let followers = resp.json();
    assert_eq!(followers.as_array().unwrap().len(), 1);
    assert_eq!(
        followers[0]["username"].as_str().unwrap(),
        user_a.username
    );

    let resp = app
        .get(
            &format!("/users/{}/following", user_a.id),
            Some(&user_a.access_token),
        )
        .await;
    let following = resp.json();
    assert_eq!(following.as_array().unwrap().len(), 1);
    assert_eq!(
        following[0]["username"].as_str().unwrap(),
        user_b.username
    );
}
