use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::app::permissions::{can_delete_comment, CommentContext};
use crate::domain::engagement::{Comment, LikeState};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCommentResult {
    Deleted,
    NotFound,
    Forbidden,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Idempotent like: the unique (user, post) pair absorbs repeats.
    /// Returns `None` when the post does not exist.
    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<LikeState>> {
        if !self.post_exists(post_id).await? {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(self.db.pool())
        .await?;

        Ok(Some(self.like_state(user_id, post_id).await?))
    }

    /// Idempotent unlike; unliking a post that was never liked is a no-op.
    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<LikeState>> {
        if !self.post_exists(post_id).await? {
            return Ok(None);
        }

        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(Some(self.like_state(user_id, post_id).await?))
    }

    pub async fn add_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        body: String,
    ) -> Result<Option<Comment>> {
        if !self.post_exists(post_id).await? {
            return Ok(None);
        }

        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (post_id, user_id, body) \
                VALUES ($1, $2, $3) \
                RETURNING id, post_id, user_id, body, created_at \
             ) \
             SELECT c.id, c.post_id, c.user_id, u.username, u.avatar, c.body, c.created_at \
             FROM inserted c \
             JOIN users u ON u.id = c.user_id",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            avatar: row.get("avatar"),
            body: row.get("body"),
            created_at: row.get("created_at"),
        }))
    }

    /// Delete gated by the centralized capability check: comment author,
    /// post author, or the admin of the post's group.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<DeleteCommentResult> {
        let row = sqlx::query(
            "SELECT c.user_id AS comment_author_id, \
                    p.author_id AS post_author_id, \
                    g.admin_id AS group_admin_id \
             FROM comments c \
             JOIN posts p ON p.id = c.post_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE c.id = $1",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(DeleteCommentResult::NotFound),
        };

        let context = CommentContext {
            comment_author_id: row.get("comment_author_id"),
            post_author_id: row.get("post_author_id"),
            group_admin_id: row.get("group_admin_id"),
        };

        if !can_delete_comment(actor_id, &context) {
            return Ok(DeleteCommentResult::Forbidden);
        }

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(self.db.pool())
            .await?;

        Ok(DeleteCommentResult::Deleted)
    }

    async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    async fn like_state(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeState> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM likes WHERE post_id = $1) AS count, \
                EXISTS (SELECT 1 FROM likes \
                        WHERE post_id = $1 AND user_id = $2) AS liked",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(LikeState {
            count: row.get("count"),
            liked: row.get("liked"),
        })
    }
}
