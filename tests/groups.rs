//! Group Tests
//!
//! Covers group creation (admin auto-membership), join/leave rules for
//! public and private groups, and the group page payload.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Creation
// ===========================================================================

#[tokio::test]
async fn create_group_makes_creator_admin_and_member() {
    let app = app().await;
    let user = app.create_user("grp_create").await;

    let resp = app
        .post_json(
            "/groups",
            json!({"name": "grp_create_club", "description": "morning lifts", "privacy": "public"}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["name"].as_str().unwrap(), "grp_create_club");
    assert_eq!(body["admin_id"].as_str().unwrap(), user.id.to_string());

    let group_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    let is_member: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
    )
    .bind(group_id)
    .bind(user.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert!(is_member);
}

#[tokio::test]
async fn create_group_requires_name() {
    let app = app().await;
    let user = app.create_user("grp_create_empty").await;

    let resp = app
        .post_json(
            "/groups",
            json!({"name": "  "}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_groups_shows_memberships() {
    let app = app().await;
    let user = app.create_user("grp_list").await;
    app.create_group(user.id, "grp_list_one", "public").await;
    app.create_group(user.id, "grp_list_two", "private").await;

    let resp = app.get("/groups", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json().as_array().unwrap().len(), 2);
}

// ===========================================================================
// Join / leave
// ===========================================================================

#[tokio::test]
async fn join_public_group() {
    let app = app().await;
    let admin = app.create_user("grp_join_admin").await;
    let joiner = app.create_user("grp_join_user").await;
    let group_id = app.create_group(admin.id, "grp_join_pub", "public").await;

    let resp = app
        .post_json(
            &format!("/groups/{}/join", group_id),
            json!({}),
            Some(&joiner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["joined"].as_bool().unwrap(), true);

    // Joining again is a no-op.
    let resp = app
        .post_json(
            &format!("/groups/{}/join", group_id),
            json!({}),
            Some(&joiner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["joined"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn join_private_group_is_forbidden() {
    let app = app().await;
    let admin = app.create_user("grp_join_priv_admin").await;
    let joiner = app.create_user("grp_join_priv_user").await;
    let group_id = app.create_group(admin.id, "grp_join_priv", "private").await;

    let resp = app
        .post_json(
            &format!("/groups/{}/join", group_id),
            json!({}),
            Some(&joiner.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "group is private");
}

#[tokio::test]
async fn join_nonexistent_group() {
    let app = app().await;
    let user = app.create_user("grp_join_ghost").await;

    let resp = app
        .post_json(
            &format!("/groups/{}/join", Uuid::new_v4()),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn leave_group() {
    let app = app().await;
    let admin = app.create_user("grp_leave_admin").await;
    let member = app.create_user("grp_leave_member").await;
    let group_id = app.create_group(admin.id, "grp_leave", "public").await;
    app.add_member(group_id, member.id).await;

    let resp = app
        .post_json(
            &format!("/groups/{}/leave", group_id),
            json!({}),
            Some(&member.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["left"].as_bool().unwrap(), true);

    // Leaving again reports nothing to do.
    let resp = app
        .post_json(
            &format!("/groups/{}/leave", group_id),
            json!({}),
            Some(&member.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["left"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn admin_cannot_leave_own_group() {
    let app = app().await;
    let admin = app.create_user("grp_leave_self_admin").await;
    let group_id = app.create_group(admin.id, "grp_leave_self", "public").await;

    let resp = app
        .post_json(
            &format!("/groups/{}/leave", group_id),
            json!({}),
            Some(&admin.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Group page
// ===========================================================================

#[tokio::test]
async fn group_page_includes_members_and_posts() {
    let app = app().await;
    let admin = app.create_user("grp_page_admin").await;
    let member = app.create_user("grp_page_member").await;
    let group_id = app.create_group(admin.id, "grp_page", "public").await;
    app.add_member(group_id, member.id).await;
    app.create_group_post(member.id, group_id, "group day").await;

    let resp = app
        .get(&format!("/groups/{}", group_id), Some(&admin.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["group"]["member_count"].as_i64().unwrap(), 2);
    assert_eq!(body["group"]["is_member"].as_bool().unwrap(), true);
    assert_eq!(body["members"].as_array().unwrap().len(), 2);
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["caption"].as_str().unwrap(), "group day");
    assert_eq!(posts[0]["group"]["name"].as_str().unwrap(), "grp_page");
}

#[tokio::test]
async fn private_group_page_hides_posts_from_non_members() {
    let app = app().await;
    let admin = app.create_user("grp_page_priv_admin").await;
    let outsider = app.create_user("grp_page_priv_out").await;
    let group_id = app.create_group(admin.id, "grp_page_priv", "private").await;
    app.create_group_post(admin.id, group_id, "members only").await;

    let resp = app
        .get(
            &format!("/groups/{}", group_id),
            Some(&outsider.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["group"]["is_member"].as_bool().unwrap(), false);
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);

    // The admin still sees the wall.
    let resp = app
        .get(&format!("/groups/{}", group_id), Some(&admin.access_token))
        .await;
    assert_eq!(resp.json()["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn posting_to_group_requires_membership() {
    let app = app().await;
    let admin = app.create_user("grp_post_admin").await;
    let outsider = app.create_user("grp_post_out").await;
    let group_id = app.create_group(admin.id, "grp_post_gate", "public").await;

    let resp = app
        .post_multipart(
            "/posts",
            &[
                ("caption", "drive-by post"),
                ("group_id", &group_id.to_string()),
            ],
            None,
            Some(&outsider.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "not a member of this group");
}
