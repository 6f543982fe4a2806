//! Post Tests
//!
//! Covers transactional post creation with workouts, exercise resolution,
//! media attachments, and the visibility rules on reads.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Creation
// ===========================================================================

#[tokio::test]
async fn create_post_with_new_exercise() {
    let app = app().await;
    let user = app.create_user("post_new_ex").await;

    let exercises = json!([
        {"name": "post_new_ex Squat", "muscle": "quadriceps", "weight": 135.0, "reps": 5, "sets": 3}
    ]);
    let resp = app
        .post_multipart(
            "/posts",
            &[
                ("caption", "leg day"),
                ("exercises", &exercises.to_string()),
            ],
            None,
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["caption"].as_str().unwrap(), "leg day");
    assert_eq!(body["author_username"].as_str().unwrap(), user.username);
    let entries = body["workout"]["exercises"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"].as_str().unwrap(), "post_new_ex Squat");
    assert_eq!(entries[0]["weight"].as_f64().unwrap(), 135.0);
    assert_eq!(entries[0]["reps"].as_i64().unwrap(), 5);
    assert_eq!(entries[0]["sets"].as_i64().unwrap(), 3);

    // The exercise row was created with the caller as owner.
    let owner: Option<Uuid> = sqlx::query_scalar(
        "SELECT owner_id FROM exercises WHERE name = $1",
    )
    .bind("post_new_ex Squat")
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(owner, Some(user.id));
}

#[tokio::test]
async fn create_post_reuses_catalog_exercise_by_name() {
    let app = app().await;
    let user = app.create_user("post_catalog_ex").await;
    let catalog_id = app
        .create_catalog_exercise("post_catalog_ex Bench Press", "chest")
        .await;

    let exercises = json!([
        {"name": "post_catalog_ex Bench Press", "weight": 185.0, "reps": 5, "sets": 5}
    ]);
    let resp = app
        .post_multipart(
            "/posts",
            &[("exercises", &exercises.to_string())],
            None,
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    let entries = body["workout"]["exercises"].as_array().unwrap();
    assert_eq!(
        entries[0]["exercise_id"].as_str().unwrap(),
        catalog_id.to_string()
    );

    // No duplicate row was created.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE name = $1")
        .bind("post_catalog_ex Bench Press")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn create_post_with_exercise_id() {
    let app = app().await;
    let user = app.create_user("post_by_id").await;
    let exercise_id = app.create_owned_exercise(user.id, "post_by_id Row").await;

    let exercises = json!([
        {"id": exercise_id, "weight": 95.0, "reps": 8, "sets": 4}
    ]);
    let resp = app
        .post_multipart(
            "/posts",
            &[("exercises", &exercises.to_string())],
            None,
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let entries = resp.json()["workout"]["exercises"].as_array().unwrap().clone();
    assert_eq!(entries[0]["name"].as_str().unwrap(), "post_by_id Row");
}

#[tokio::test]
async fn foreign_owned_exercise_fails_and_rolls_back() {
    let app = app().await;
    let owner = app.create_user("post_foreign_owner").await;
    let caller = app.create_user("post_foreign_caller").await;
    let exercise_id = app
        .create_owned_exercise(owner.id, "post_foreign Curl")
        .await;

    let exercises = json!([
        {"id": exercise_id, "weight": 30.0, "reps": 10, "sets": 3}
    ]);
    let resp = app
        .post_multipart(
            "/posts",
            &[
                ("caption", "stolen gains"),
                ("exercises", &exercises.to_string()),
            ],
            None,
            Some(&caller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "exercise owned by another user");

    // The whole post rolled back: no post, workout, or entry rows remain.
    let posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(caller.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(posts, 0);
    let workouts: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM workouts w \
         JOIN posts p ON p.id = w.post_id WHERE p.author_id = $1",
    )
    .bind(caller.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(workouts, 0);
}

#[tokio::test]
async fn unknown_exercise_id_fails_and_rolls_back() {
    let app = app().await;
    let user = app.create_user("post_ghost_ex").await;

    let exercises = json!([
        {"id": Uuid::new_v4(), "weight": 45.0, "reps": 10, "sets": 3}
    ]);
    let resp = app
        .post_multipart(
            "/posts",
            &[("exercises", &exercises.to_string())],
            None,
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(user.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(posts, 0);
}

#[tokio::test]
async fn create_post_with_media() {
    let app = app().await;
    let user = app.create_user("post_media").await;

    let payload: &[u8] = b"\x89PNG\r\n\x1a\nfakepixels";
    let resp = app
        .post_multipart(
            "/posts",
            &[("caption", "progress pic")],
            Some(("media", "image/png", payload)),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    let media = body["media"].as_array().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0]["kind"].as_str().unwrap(), "image");
    assert_eq!(media[0]["mime_type"].as_str().unwrap(), "image/png");
    assert_eq!(media[0]["bytes"].as_i64().unwrap(), payload.len() as i64);
}

#[tokio::test]
async fn create_post_rejects_unsupported_media_type() {
    let app = app().await;
    let user = app.create_user("post_media_bad").await;

    let resp = app
        .post_multipart(
            "/posts",
            &[("caption", "spreadsheet day")],
            Some(("media", "application/pdf", b"%PDF-1.4" as &[u8])),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unsupported media type");
}

#[tokio::test]
async fn create_post_rejects_empty_body() {
    let app = app().await;
    let user = app.create_user("post_empty").await;

    let resp = app
        .post_multipart("/posts", &[], None, Some(&user.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "post cannot be empty");
}

#[tokio::test]
async fn create_post_rejects_malformed_exercises() {
    let app = app().await;
    let user = app.create_user("post_bad_json").await;

    let resp = app
        .post_multipart(
            "/posts",
            &[("exercises", "not json")],
            None,
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Reads & deletes
// ===========================================================================

#[tokio::test]
async fn get_post_visible_to_author() {
    let app = app().await;
    let user = app.create_user("post_get_own").await;
    let post_id = app.create_post_for_user(user.id, "mine").await;

    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["caption"].as_str().unwrap(), "mine");
}

#[tokio::test]
async fn private_authors_post_hidden_from_strangers() {
    let app = app().await;
    let author = app.create_private_user("post_get_priv").await;
    let stranger = app.create_user("post_get_stranger").await;
    let post_id = app.create_post_for_user(author.id, "secret").await;

    let resp = app
        .get(&format!("/posts/{}", post_id), Some(&stranger.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_user_posts_respects_privacy() {
    let app = app().await;
    let author = app.create_private_user("post_list_priv").await;
    let stranger = app.create_user("post_list_stranger").await;
    app.create_post_for_user(author.id, "hidden").await;

    let resp = app
        .get(
            &format!("/users/{}/posts", author.id),
            Some(&stranger.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 0);

    // The owner sees their own posts.
    let resp = app
        .get(
            &format!("/users/{}/posts", author.id),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_post_is_author_only() {
    let app = app().await;
    let author = app.create_user("post_del_author").await;
    let other = app.create_user("post_del_other").await;
    let post_id = app.create_post_for_user(author.id, "ephemeral").await;

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&other.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&author.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
