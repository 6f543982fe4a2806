use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

use crate::app::exercises::{ExerciseEntryInput, ExerciseService};
use crate::domain::media::MediaKind;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub caption: Option<String>,
    pub group_id: Option<Uuid>,
    pub exercises: Vec<ExerciseEntryInput>,
    pub media: Option<NewMedia>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub payload: Vec<u8>,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
    exercises: ExerciseService,
}

impl PostService {
    pub fn new(db: Db, exercises: ExerciseService) -> Self {
        Self { db, exercises }
    }

    /// Create the post with its workout, exercise entries, and media in a
    /// single transaction; any failure rolls the whole post back.
    pub async fn create_post(&self, author_id: Uuid, new_post: NewPost) -> Result<Uuid> {
        let mut tx = self.db.pool().begin().await?;

        if let Some(group_id) = new_post.group_id {
            let is_member: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM group_members \
                 WHERE group_id = $1 AND user_id = $2)",
            )
            .bind(group_id)
            .bind(author_id)
            .fetch_one(&mut *tx)
            .await?;

            if !is_member {
                tx.rollback().await?;
                return Err(anyhow!("not a member of this group"));
            }
        }

        let post_id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, group_id, caption) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(author_id)
        .bind(new_post.group_id)
        .bind(&new_post.caption)
        .fetch_one(&mut *tx)
        .await?;

        if !new_post.exercises.is_empty() {
            let workout_id: Uuid = sqlx::query_scalar(
                "INSERT INTO workouts (post_id, performed_on) \
                 VALUES ($1, CURRENT_DATE) RETURNING id",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

            for entry in &new_post.exercises {
                let exercise_id = match self
                    .exercises
                    .resolve_with_tx(author_id, entry, &mut tx)
                    .await
                {
                    Ok(id) => id,
                    Err(err) => {
                        tx.rollback().await?;
                        return Err(err);
                    }
                };

                sqlx::query(
                    "INSERT INTO workout_exercises \
                     (workout_id, exercise_id, weight, reps, sets) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(workout_id)
                .bind(exercise_id)
                .bind(entry.weight)
                .bind(entry.reps)
                .bind(entry.sets)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(media) = &new_post.media {
            let kind = match MediaKind::from_mime(&media.mime_type) {
                Some(kind) => kind,
                None => {
                    tx.rollback().await?;
                    return Err(anyhow!("unsupported media type"));
                }
            };

            sqlx::query(
                "INSERT INTO media (post_id, data, mime_type, bytes, kind) \
                 VALUES ($1, $2, $3, $4, $5::media_kind)",
            )
            .bind(post_id)
            .bind(STANDARD.encode(&media.payload))
            .bind(&media.mime_type)
            .bind(media.payload.len() as i64)
            .bind(kind.as_db())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(post_id)
    }

    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
