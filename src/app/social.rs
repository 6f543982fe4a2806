use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::social_graph::{FollowOutcome, Relationship};
use crate::domain::user::{Privacy, UserSummary};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Advance the (requester, target) pair through the follow state machine:
    /// public targets gain an edge immediately, private targets a pending
    /// request. Idempotent in every state. An edge and a request for the same
    /// pair never coexist; both writes happen in one transaction.
    ///
    /// Returns `None` when the target does not exist.
    pub async fn follow(&self, requester_id: Uuid, target_id: Uuid) -> Result<Option<FollowOutcome>> {
        let mut tx = self.db.pool().begin().await?;

        let privacy: Option<String> =
            sqlx::query_scalar("SELECT privacy::text FROM users WHERE id = $1")
                .bind(target_id)
                .fetch_optional(&mut *tx)
                .await?;

        let privacy = match privacy.as_deref().and_then(Privacy::from_db) {
            Some(privacy) => privacy,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let outcome = match privacy {
            Privacy::Public => {
                sqlx::query(
                    "DELETE FROM follow_requests WHERE requester_id = $1 AND target_id = $2",
                )
                .bind(requester_id)
                .bind(target_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(requester_id)
                .bind(target_id)
                .execute(&mut *tx)
                .await?;

                FollowOutcome::Following
            }
            Privacy::Private => {
                let already_following: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM follows \
                     WHERE follower_id = $1 AND followee_id = $2)",
                )
                .bind(requester_id)
                .bind(target_id)
                .fetch_one(&mut *tx)
                .await?;

                if already_following {
                    FollowOutcome::Following
                } else {
                    sqlx::query(
                        "INSERT INTO follow_requests (requester_id, target_id) VALUES ($1, $2) \
                         ON CONFLICT DO NOTHING",
                    )
                    .bind(requester_id)
                    .bind(target_id)
                    .execute(&mut *tx)
                    .await?;

                    FollowOutcome::Pending
                }
            }
        };

        tx.commit().await?;
        Ok(Some(outcome))
    }

    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower_id)
                .bind(followee_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Convert a pending request into an edge. Both statements run in one
    /// transaction, so a failure leaves the pair untouched.
    pub async fn accept_request(&self, target_id: Uuid, requester_id: Uuid) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM follow_requests WHERE requester_id = $1 AND target_id = $2",
        )
        .bind(requester_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(requester_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn decline_request(&self, target_id: Uuid, requester_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follow_requests WHERE requester_id = $1 AND target_id = $2",
        )
        .bind(requester_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_requests(&self, target_id: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.avatar \
             FROM follow_requests r \
             JOIN users u ON u.id = r.requester_id \
             WHERE r.target_id = $1 \
             ORDER BY r.created_at DESC",
        )
        .bind(target_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row)).collect())
    }

    pub async fn list_followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.avatar \
             FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.followee_id = $1 \
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row)).collect())
    }

    pub async fn list_following(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.avatar \
             FROM follows f \
             JOIN users u ON u.id = f.followee_id \
             WHERE f.follower_id = $1 \
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|row| summary_from_row(&row)).collect())
    }

    pub async fn relationship(&self, viewer_id: Uuid, other_id: Uuid) -> Result<Relationship> {
        let row = sqlx::query(
            "SELECT \
                EXISTS (SELECT 1 FROM follows \
                        WHERE follower_id = $1 AND followee_id = $2) AS is_following, \
                EXISTS (SELECT 1 FROM follow_requests \
                        WHERE requester_id = $1 AND target_id = $2) AS is_pending",
        )
        .bind(viewer_id)
        .bind(other_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Relationship {
            is_following: row.get("is_following"),
            is_pending: row.get("is_pending"),
        })
    }
}

fn summary_from_row(row: &sqlx::postgres::PgRow) -> UserSummary {
    UserSummary {
        id: row.get("id"),
        username: row.get("username"),
        avatar: row.get("avatar"),
    }
}
