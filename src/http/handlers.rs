use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::engagement::{DeleteCommentResult, EngagementService};
use crate::app::exercises::{ExerciseEntryInput, ExerciseService};
use crate::app::feed::FeedService;
use crate::app::groups::{GroupService, JoinResult, LeaveResult};
use crate::app::posts::{NewMedia, NewPost, PostService};
use crate::app::search::SearchService;
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::engagement::{Comment, LikeState};
use crate::domain::group::{Group, GroupOverview, GroupPrivacy};
use crate::domain::post::PostDetail;
use crate::domain::social_graph::{FollowOutcome, Relationship};
use crate::domain::user::{Privacy, PublicProfile, User, UserSummary};
use crate::domain::workout::Exercise;
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(query: &PaginationQuery) -> Result<i64, AppError> {
    let limit = query.limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    Ok(limit)
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

/// Map a unique-violation on the users.username key to a conflict response.
fn map_username_conflict(err: anyhow::Error, context: &'static str) -> AppError {
    if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
        if let Some(db_err) = sqlx_err.as_database_error() {
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint().unwrap_or_default().contains("users_username_key")
            {
                return AppError::conflict("username already taken");
            }
        }
    }
    tracing::error!(error = ?err, "{}", context);
    AppError::internal(context)
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth & profile
// ---------------------------------------------------------------------------

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokenResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if payload.password.trim().len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = auth_service(&state);
    let (user, tokens) = service
        .register(username, payload.password)
        .await
        .map_err(|err| map_username_conflict(err, "failed to register user"))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            tokens: AuthTokenResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                access_expires_at: tokens.access_expires_at,
                refresh_expires_at: tokens.refresh_expires_at,
            },
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = auth_service(&state);
    let tokens = service
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    let tokens = service
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to refresh token");
            AppError::internal("failed to refresh token")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub refresh_token: String,
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    service
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: PublicProfile,
    pub groups: Vec<Group>,
}

pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let users = UserService::new(state.db.clone());
    let profile = users.get_profile(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch profile");
        AppError::internal("failed to fetch profile")
    })?;

    let profile = profile.ok_or_else(|| AppError::not_found("user not found"))?;

    let groups = GroupService::new(state.db.clone())
        .list_memberships(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list groups");
            AppError::internal("failed to list groups")
        })?;

    Ok(Json(ProfileResponse { profile, groups }))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub privacy: Option<Privacy>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if let Some(username) = &payload.username {
        if username.trim().is_empty() {
            return Err(AppError::bad_request("username cannot be empty"));
        }
    }

    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(
            auth.user_id,
            payload.username.map(|name| name.trim().to_string()),
            payload.display_name,
            payload.bio,
            payload.avatar,
            payload.privacy,
        )
        .await
        .map_err(|err| map_username_conflict(err, "failed to update profile"))?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

// ---------------------------------------------------------------------------
// Users & social graph
// ---------------------------------------------------------------------------

pub async fn get_user(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PublicProfile>, AppError> {
    let service = UserService::new(state.db.clone());
    let profile = service.get_profile(id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn list_user_posts(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDetail>>, AppError> {
    let limit = page_limit(&query)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = FeedService::new(state.db.clone());
    let (posts, next_cursor) = service
        .user_posts(id, auth.user_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list user posts");
            AppError::internal("failed to list user posts")
        })?;

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub status: FollowOutcome,
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<FollowResponse>), AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot follow yourself"));
    }

    let service = SocialService::new(state.db.clone());
    let outcome = service.follow(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, follower_id = %auth.user_id, target_id = %id, "failed to follow user");
        AppError::internal("failed to follow user")
    })?;

    match outcome {
        Some(FollowOutcome::Following) => Ok((
            StatusCode::OK,
            Json(FollowResponse {
                status: FollowOutcome::Following,
            }),
        )),
        Some(FollowOutcome::Pending) => Ok((
            StatusCode::ACCEPTED,
            Json(FollowResponse {
                status: FollowOutcome::Pending,
            }),
        )),
        None => Err(AppError::not_found("user not found")),
    }
}

#[derive(Serialize)]
pub struct UnfollowResponse {
    pub unfollowed: bool,
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnfollowResponse>, AppError> {
    if auth.user_id == id {
        return Err(AppError::bad_request("cannot unfollow yourself"));
    }

    let service = SocialService::new(state.db.clone());
    let unfollowed = service.unfollow(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, follower_id = %auth.user_id, target_id = %id, "failed to unfollow user");
        AppError::internal("failed to unfollow user")
    })?;

    Ok(Json(UnfollowResponse { unfollowed }))
}

pub async fn list_follow_requests(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let service = SocialService::new(state.db.clone());
    let requests = service.list_requests(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list follow requests");
        AppError::internal("failed to list follow requests")
    })?;

    Ok(Json(requests))
}

pub async fn accept_follow_request(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = SocialService::new(state.db.clone());
    let accepted = service
        .accept_request(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, target_id = %auth.user_id, requester_id = %id, "failed to accept follow request");
            AppError::internal("failed to accept follow request")
        })?;

    if accepted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("no pending follow request"))
    }
}

pub async fn decline_follow_request(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = SocialService::new(state.db.clone());
    let declined = service
        .decline_request(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, target_id = %auth.user_id, requester_id = %id, "failed to decline follow request");
            AppError::internal("failed to decline follow request")
        })?;

    if declined {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("no pending follow request"))
    }
}

pub async fn list_followers(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let service = SocialService::new(state.db.clone());
    let followers = service.list_followers(id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to list followers");
        AppError::internal("failed to list followers")
    })?;

    Ok(Json(followers))
}

pub async fn list_following(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let service = SocialService::new(state.db.clone());
    let following = service.list_following(id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to list following");
        AppError::internal("failed to list following")
    })?;

    Ok(Json(following))
}

pub async fn relationship(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Relationship>, AppError> {
    let service = SocialService::new(state.db.clone());
    let relationship = service
        .relationship(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, viewer_id = %auth.user_id, other_id = %id, "failed to fetch relationship");
            AppError::internal("failed to fetch relationship")
        })?;

    Ok(Json(relationship))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostDetail>), AppError> {
    let mut caption: Option<String> = None;
    let mut group_id: Option<Uuid> = None;
    let mut exercises: Vec<ExerciseEntryInput> = Vec::new();
    let mut media: Option<NewMedia> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("invalid caption field"))?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    caption = Some(text);
                }
            }
            "group_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("invalid group_id field"))?;
                group_id = Some(
                    Uuid::parse_str(text.trim())
                        .map_err(|_| AppError::bad_request("group_id must be a UUID"))?,
                );
            }
            "exercises" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("invalid exercises field"))?;
                exercises = serde_json::from_str(&text)
                    .map_err(|_| AppError::bad_request("exercises must be a JSON array"))?;
            }
            "media" => {
                let mime_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .ok_or_else(|| AppError::bad_request("media field needs a content type"))?;
                let payload = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("failed to read media field"))?
                    .to_vec();
                if payload.len() as i64 > state.upload_max_bytes {
                    return Err(AppError::bad_request("media exceeds the upload size limit"));
                }
                media = Some(NewMedia { payload, mime_type });
            }
            _ => {}
        }
    }

    if caption.is_none() && exercises.is_empty() && media.is_none() {
        return Err(AppError::bad_request("post cannot be empty"));
    }

    let exercise_service = ExerciseService::new(state.db.clone(), state.catalog.clone());
    let service = PostService::new(state.db.clone(), exercise_service);
    let post_id = service
        .create_post(
            auth.user_id,
            NewPost {
                caption,
                group_id,
                exercises,
                media,
            },
        )
        .await
        .map_err(|err| {
            let message = err.to_string();
            if message.contains("not a member of this group") {
                return AppError::forbidden("not a member of this group");
            }
            if message.contains("owned by another user") {
                return AppError::forbidden("exercise owned by another user");
            }
            if message.contains("exercise not found") {
                return AppError::not_found("exercise not found");
            }
            if message.contains("unsupported media type") {
                return AppError::bad_request("unsupported media type");
            }
            if message.contains("needs an id or a name") {
                return AppError::bad_request("exercise entry needs an id or a name");
            }
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    let feed = FeedService::new(state.db.clone());
    let post = feed
        .get_post(post_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to load created post");
            AppError::internal("failed to load created post")
        })?
        .ok_or_else(|| AppError::internal("failed to load created post"))?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostDetail>, AppError> {
    let service = FeedService::new(state.db.clone());
    let post = service.get_post(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let exercise_service = ExerciseService::new(state.db.clone(), state.catalog.clone());
    let service = PostService::new(state.db.clone(), exercise_service);
    let deleted = service.delete_post(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("post not found"))
    }
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeState>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let liked = service.like_post(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to like post");
        AppError::internal("failed to like post")
    })?;

    match liked {
        Some(like_state) => Ok(Json(like_state)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn unlike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeState>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let unliked = service.unlike_post(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to unlike post");
        AppError::internal("failed to unlike post")
    })?;

    match unliked {
        Some(like_state) => Ok(Json(like_state)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn comment_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let body = payload.body.trim().to_string();
    if body.is_empty() {
        return Err(AppError::bad_request("comment cannot be empty"));
    }

    let service = EngagementService::new(state.db.clone());
    let comment = service
        .add_comment(auth.user_id, id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to add comment");
            AppError::internal("failed to add comment")
        })?;

    match comment {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = EngagementService::new(state.db.clone());
    let result = service.delete_comment(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, comment_id = %id, "failed to delete comment");
        AppError::internal("failed to delete comment")
    })?;

    match result {
        DeleteCommentResult::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteCommentResult::NotFound => Err(AppError::not_found("comment not found")),
        DeleteCommentResult::Forbidden => {
            Err(AppError::forbidden("not allowed to delete this comment"))
        }
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub async fn list_groups(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Group>>, AppError> {
    let service = GroupService::new(state.db.clone());
    let groups = service.list_memberships(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list groups");
        AppError::internal("failed to list groups")
    })?;

    Ok(Json(groups))
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub privacy: Option<GroupPrivacy>,
}

pub async fn create_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("group name cannot be empty"));
    }

    let service = GroupService::new(state.db.clone());
    let group = service
        .create_group(
            auth.user_id,
            name,
            payload.description,
            payload.privacy.unwrap_or(GroupPrivacy::Public),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create group");
            AppError::internal("failed to create group")
        })?;

    Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Serialize)]
pub struct GroupDetailResponse {
    pub group: GroupOverview,
    pub members: Vec<UserSummary>,
    pub posts: Vec<PostDetail>,
}

pub async fn get_group(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<GroupDetailResponse>, AppError> {
    let service = GroupService::new(state.db.clone());
    let overview = service.get_overview(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, group_id = %id, "failed to fetch group");
        AppError::internal("failed to fetch group")
    })?;

    let overview = overview.ok_or_else(|| AppError::not_found("group not found"))?;

    let members = service.list_members(id).await.map_err(|err| {
        tracing::error!(error = ?err, group_id = %id, "failed to list group members");
        AppError::internal("failed to list group members")
    })?;

    // The wall of a private group is members-only; metadata and the member
    // list stay visible so the page can render a join prompt.
    let posts = if overview.is_member || overview.group.privacy == GroupPrivacy::Public {
        FeedService::new(state.db.clone())
            .group_posts(id, auth.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, group_id = %id, "failed to list group posts");
                AppError::internal("failed to list group posts")
            })?
    } else {
        Vec::new()
    };

    Ok(Json(GroupDetailResponse {
        group: overview,
        members,
        posts,
    }))
}

#[derive(Serialize)]
pub struct JoinGroupResponse {
    pub joined: bool,
}

pub async fn join_group(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<JoinGroupResponse>, AppError> {
    let service = GroupService::new(state.db.clone());
    let result = service.join(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, group_id = %id, user_id = %auth.user_id, "failed to join group");
        AppError::internal("failed to join group")
    })?;

    match result {
        JoinResult::Joined => Ok(Json(JoinGroupResponse { joined: true })),
        JoinResult::AlreadyMember => Ok(Json(JoinGroupResponse { joined: false })),
        JoinResult::PrivateGroup => Err(AppError::forbidden("group is private")),
        JoinResult::NotFound => Err(AppError::not_found("group not found")),
    }
}

#[derive(Serialize)]
pub struct LeaveGroupResponse {
    pub left: bool,
}

pub async fn leave_group(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LeaveGroupResponse>, AppError> {
    let service = GroupService::new(state.db.clone());
    let result = service.leave(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, group_id = %id, user_id = %auth.user_id, "failed to leave group");
        AppError::internal("failed to leave group")
    })?;

    match result {
        LeaveResult::Left => Ok(Json(LeaveGroupResponse { left: true })),
        LeaveResult::NotMember => Ok(Json(LeaveGroupResponse { left: false })),
        LeaveResult::AdminCannotLeave => {
            Err(AppError::bad_request("the group admin cannot leave the group"))
        }
    }
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

pub async fn home_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDetail>>, AppError> {
    let limit = page_limit(&query)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = FeedService::new(state.db.clone());
    let (posts, next_cursor) = service
        .home_feed(auth.user_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch feed");
            AppError::internal("failed to fetch feed")
        })?;

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn groups_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<PostDetail>>, AppError> {
    let limit = page_limit(&query)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = FeedService::new(state.db.clone());
    let (posts, next_cursor) = service
        .group_feed(auth.user_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch groups feed");
            AppError::internal("failed to fetch groups feed")
        })?;

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

// ---------------------------------------------------------------------------
// Exercises & search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ExerciseQuery {
    pub muscle: Option<String>,
}

pub async fn list_exercises(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ExerciseQuery>,
) -> Result<Json<Vec<Exercise>>, AppError> {
    let muscle = query.muscle.unwrap_or_default();

    let service = ExerciseService::new(state.db.clone(), state.catalog.clone());
    let exercises = service
        .search(auth.user_id, muscle.trim())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list exercises");
            AppError::internal("failed to list exercises")
        })?;

    Ok(Json(exercises))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub users: Vec<PublicProfile>,
    pub groups: Vec<GroupOverview>,
}

pub async fn search(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let q = query.q.unwrap_or_default();
    let q = q.trim();
    if q.is_empty() {
        return Err(AppError::bad_request("q is required"));
    }

    let service = SearchService::new(state.db.clone());
    let users = service.search_users(q).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to search users");
        AppError::internal("failed to search users")
    })?;
    let groups = service.search_groups(auth.user_id, q).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to search groups");
        AppError::internal("failed to search groups")
    })?;

    Ok(Json(SearchResponse { users, groups }))
}
