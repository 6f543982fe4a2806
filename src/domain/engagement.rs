use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Like state of a post from the caller's point of view, returned after
/// every like/unlike mutation.
#[derive(Debug, Clone, Serialize)]
pub struct LikeState {
    pub count: i64,
    pub liked: bool,
}
