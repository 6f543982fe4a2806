use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::Comment;
use crate::domain::media::MediaItem;
use crate::domain::workout::Workout;

#[derive(Debug, Clone, Serialize)]
pub struct PostGroup {
    pub id: Uuid,
    pub name: String,
    pub admin_id: Uuid,
}

/// Denormalized post as served to clients: author and group identity,
/// attachments, workout data, and engagement state for the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<PostGroup>,
    pub caption: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout: Option<Workout>,
    pub media: Vec<MediaItem>,
    pub like_count: i64,
    pub liked_by_viewer: bool,
    /// Oldest first.
    pub comments: Vec<Comment>,
}
