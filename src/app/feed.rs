use std::collections::{HashMap, HashSet};

use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::Comment;
use crate::domain::media::{MediaItem, MediaKind};
use crate::domain::post::{PostDetail, PostGroup};
use crate::domain::workout::{Workout, WorkoutEntry};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

/// Bare post row with author/group identity, before hydration.
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    author_avatar: Option<String>,
    group_id: Option<Uuid>,
    group_name: Option<String>,
    group_admin_id: Option<Uuid>,
    caption: Option<String>,
    created_at: OffsetDateTime,
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, u.username AS author_username, u.avatar AS author_avatar, \
     p.group_id, g.name AS group_name, g.admin_id AS group_admin_id, \
     p.caption, p.created_at \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The viewer's home feed: own posts, posts by followed users, and posts
    /// in the viewer's groups, newest first. Visibility falls out of the
    /// selection itself: private authors only appear once followed.
    pub async fn home_feed(
        &self,
        viewer_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<PostDetail>, Option<(OffsetDateTime, Uuid)>)> {
        let limit_plus = limit + 1;
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE (p.author_id = $1 \
                        OR p.author_id IN ( \
                            SELECT followee_id FROM follows WHERE follower_id = $1 \
                        ) \
                        OR p.group_id IN ( \
                            SELECT group_id FROM group_members WHERE user_id = $1 \
                        )) \
                       AND (p.created_at < $2 OR (p.created_at = $2 AND p.id < $3)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $4",
                ))
                .bind(viewer_id)
                .bind(created_at)
                .bind(post_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE p.author_id = $1 \
                        OR p.author_id IN ( \
                            SELECT followee_id FROM follows WHERE follower_id = $1 \
                        ) \
                        OR p.group_id IN ( \
                            SELECT group_id FROM group_members WHERE user_id = $1 \
                        ) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $2",
                ))
                .bind(viewer_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut posts = rows.iter().map(post_row).collect::<Vec<_>>();
        let next_cursor = if posts.len() > limit as usize {
            let extra = posts.pop().expect("checked len");
            Some((extra.created_at, extra.id))
        } else {
            None
        };

        let details = self.hydrate(posts, viewer_id).await?;
        Ok((details, next_cursor))
    }

    /// Posts from the viewer's groups only.
    pub async fn group_feed(
        &self,
        viewer_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<PostDetail>, Option<(OffsetDateTime, Uuid)>)> {
        let limit_plus = limit + 1;
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE p.group_id IN ( \
                            SELECT group_id FROM group_members WHERE user_id = $1 \
                        ) \
                       AND (p.created_at < $2 OR (p.created_at = $2 AND p.id < $3)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $4",
                ))
                .bind(viewer_id)
                .bind(created_at)
                .bind(post_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE p.group_id IN ( \
                            SELECT group_id FROM group_members WHERE user_id = $1 \
                        ) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $2",
                ))
                .bind(viewer_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut posts = rows.iter().map(post_row).collect::<Vec<_>>();
        let next_cursor = if posts.len() > limit as usize {
            let extra = posts.pop().expect("checked len");
            Some((extra.created_at, extra.id))
        } else {
            None
        };

        let details = self.hydrate(posts, viewer_id).await?;
        Ok((details, next_cursor))
    }

    /// Wall of one group, for its page. Callers gate access for private
    /// groups before asking.
    pub async fn group_posts(&self, group_id: Uuid, viewer_id: Uuid) -> Result<Vec<PostDetail>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             WHERE p.group_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC",
        ))
        .bind(group_id)
        .fetch_all(self.db.pool())
        .await?;

        let posts = rows.iter().map(post_row).collect::<Vec<_>>();
        self.hydrate(posts, viewer_id).await
    }

    /// A user's posts as visible to the viewer: everything for the owner and
    /// their followers, public-account posts for everyone else, and group
    /// posts additionally gated by group membership when the group is
    /// private.
    pub async fn user_posts(
        &self,
        target_id: Uuid,
        viewer_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<PostDetail>, Option<(OffsetDateTime, Uuid)>)> {
        let limit_plus = limit + 1;
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE p.author_id = $1 \
                       AND (u.privacy = 'public' \
                            OR p.author_id = $2 \
                            OR EXISTS ( \
                                SELECT 1 FROM follows \
                                WHERE follower_id = $2 AND followee_id = $1 \
                            ) \
                            OR (p.group_id IS NOT NULL AND EXISTS ( \
                                SELECT 1 FROM group_members \
                                WHERE group_id = p.group_id AND user_id = $2 \
                            ))) \
                       AND (p.group_id IS NULL \
                            OR g.privacy = 'public' \
                            OR p.author_id = $2 \
                            OR EXISTS ( \
                                SELECT 1 FROM group_members \
                                WHERE group_id = p.group_id AND user_id = $2 \
                            )) \
                       AND (p.created_at < $3 OR (p.created_at = $3 AND p.id < $4)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $5",
                ))
                .bind(target_id)
                .bind(viewer_id)
                .bind(created_at)
                .bind(post_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     WHERE p.author_id = $1 \
                       AND (u.privacy = 'public' \
                            OR p.author_id = $2 \
                            OR EXISTS ( \
                                SELECT 1 FROM follows \
                                WHERE follower_id = $2 AND followee_id = $1 \
                            ) \
                            OR (p.group_id IS NOT NULL AND EXISTS ( \
                                SELECT 1 FROM group_members \
                                WHERE group_id = p.group_id AND user_id = $2 \
                            ))) \
                       AND (p.group_id IS NULL \
                            OR g.privacy = 'public' \
                            OR p.author_id = $2 \
                            OR EXISTS ( \
                                SELECT 1 FROM group_members \
                                WHERE group_id = p.group_id AND user_id = $2 \
                            )) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $3",
                ))
                .bind(target_id)
                .bind(viewer_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut posts = rows.iter().map(post_row).collect::<Vec<_>>();
        let next_cursor = if posts.len() > limit as usize {
            let extra = posts.pop().expect("checked len");
            Some((extra.created_at, extra.id))
        } else {
            None
        };

        let details = self.hydrate(posts, viewer_id).await?;
        Ok((details, next_cursor))
    }

    /// Single post under the same visibility rules as [`user_posts`].
    pub async fn get_post(&self, post_id: Uuid, viewer_id: Uuid) -> Result<Option<PostDetail>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             WHERE p.id = $1 \
               AND (u.privacy = 'public' \
                    OR p.author_id = $2 \
                    OR EXISTS ( \
                        SELECT 1 FROM follows \
                        WHERE follower_id = $2 AND followee_id = p.author_id \
                    ) \
                    OR (p.group_id IS NOT NULL AND EXISTS ( \
                        SELECT 1 FROM group_members \
                        WHERE group_id = p.group_id AND user_id = $2 \
                    ))) \
               AND (p.group_id IS NULL \
                    OR g.privacy = 'public' \
                    OR p.author_id = $2 \
                    OR EXISTS ( \
                        SELECT 1 FROM group_members \
                        WHERE group_id = p.group_id AND user_id = $2 \
                    ))",
        ))
        .bind(post_id)
        .bind(viewer_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let details = self.hydrate(vec![post_row(&row)], viewer_id).await?;
        Ok(details.into_iter().next())
    }

    /// Assemble the denormalized view for a page of posts with a fixed number
    /// of batched queries: media, workouts, entries, like counts, the
    /// viewer's likes, and comments.
    async fn hydrate(&self, posts: Vec<PostRow>, viewer_id: Uuid) -> Result<Vec<PostDetail>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();

        let mut media_by_post: HashMap<Uuid, Vec<MediaItem>> = HashMap::new();
        let media_rows = sqlx::query(
            "SELECT id, post_id, kind::text AS kind, mime_type, bytes, data \
             FROM media WHERE post_id = ANY($1) \
             ORDER BY created_at",
        )
        .bind(&post_ids)
        .fetch_all(self.db.pool())
        .await?;
        for row in media_rows {
            let kind: String = row.get("kind");
            let kind = MediaKind::from_db(&kind)
                .ok_or_else(|| anyhow::anyhow!("unknown media kind: {}", kind))?;
            media_by_post
                .entry(row.get("post_id"))
                .or_default()
                .push(MediaItem {
                    id: row.get("id"),
                    kind,
                    mime_type: row.get("mime_type"),
                    bytes: row.get("bytes"),
                    data: row.get("data"),
                });
        }

        let workout_rows = sqlx::query(
            "SELECT id, post_id, performed_on FROM workouts WHERE post_id = ANY($1)",
        )
        .bind(&post_ids)
        .fetch_all(self.db.pool())
        .await?;
        let mut workout_by_post: HashMap<Uuid, Workout> = HashMap::new();
        let mut workout_post: HashMap<Uuid, Uuid> = HashMap::new();
        for row in workout_rows {
            let workout_id: Uuid = row.get("id");
            let post_id: Uuid = row.get("post_id");
            workout_post.insert(workout_id, post_id);
            workout_by_post.insert(
                post_id,
                Workout {
                    id: workout_id,
                    performed_on: row.get("performed_on"),
                    exercises: Vec::new(),
                },
            );
        }

        if !workout_post.is_empty() {
            let workout_ids: Vec<Uuid> = workout_post.keys().copied().collect();
            let entry_rows = sqlx::query(
                "SELECT we.workout_id, we.exercise_id, e.name, e.muscle, e.equipment, \
                        we.weight, we.reps, we.sets \
                 FROM workout_exercises we \
                 JOIN exercises e ON e.id = we.exercise_id \
                 WHERE we.workout_id = ANY($1) \
                 ORDER BY e.name",
            )
            .bind(&workout_ids)
            .fetch_all(self.db.pool())
            .await?;
            for row in entry_rows {
                let workout_id: Uuid = row.get("workout_id");
                let post_id = workout_post[&workout_id];
                if let Some(workout) = workout_by_post.get_mut(&post_id) {
                    workout.exercises.push(WorkoutEntry {
                        exercise_id: row.get("exercise_id"),
                        name: row.get("name"),
                        muscle: row.get("muscle"),
                        equipment: row.get("equipment"),
                        weight: row.get("weight"),
                        reps: row.get("reps"),
                        sets: row.get("sets"),
                    });
                }
            }
        }

        let mut like_counts: HashMap<Uuid, i64> = HashMap::new();
        let like_rows = sqlx::query(
            "SELECT post_id, COUNT(*) AS count FROM likes \
             WHERE post_id = ANY($1) GROUP BY post_id",
        )
        .bind(&post_ids)
        .fetch_all(self.db.pool())
        .await?;
        for row in like_rows {
            like_counts.insert(row.get("post_id"), row.get("count"));
        }

        let liked_rows = sqlx::query(
            "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(viewer_id)
        .bind(&post_ids)
        .fetch_all(self.db.pool())
        .await?;
        let liked: HashSet<Uuid> = liked_rows
            .into_iter()
            .map(|row| row.get("post_id"))
            .collect();

        let mut comments_by_post: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        let comment_rows = sqlx::query(
            "SELECT c.id, c.post_id, c.user_id, u.username, u.avatar, c.body, c.created_at \
             FROM comments c \
             JOIN users u ON u.id = c.user_id \
             WHERE c.post_id = ANY($1) \
             ORDER BY c.created_at, c.id",
        )
        .bind(&post_ids)
        .fetch_all(self.db.pool())
        .await?;
        for row in comment_rows {
            comments_by_post
                .entry(row.get("post_id"))
                .or_default()
                .push(Comment {
                    id: row.get("id"),
                    post_id: row.get("post_id"),
                    user_id: row.get("user_id"),
                    username: row.get("username"),
                    avatar: row.get("avatar"),
                    body: row.get("body"),
                    created_at: row.get("created_at"),
                });
        }

        let details = posts
            .into_iter()
            .map(|post| {
                let group = match (post.group_id, post.group_name, post.group_admin_id) {
                    (Some(id), Some(name), Some(admin_id)) => {
                        Some(PostGroup { id, name, admin_id })
                    }
                    _ => None,
                };
                PostDetail {
                    id: post.id,
                    author_id: post.author_id,
                    author_username: post.author_username,
                    author_avatar: post.author_avatar,
                    group,
                    caption: post.caption,
                    created_at: post.created_at,
                    workout: workout_by_post.remove(&post.id),
                    media: media_by_post.remove(&post.id).unwrap_or_default(),
                    like_count: like_counts.get(&post.id).copied().unwrap_or(0),
                    liked_by_viewer: liked.contains(&post.id),
                    comments: comments_by_post.remove(&post.id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(details)
    }
}

fn post_row(row: &sqlx::postgres::PgRow) -> PostRow {
    PostRow {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        author_avatar: row.get("author_avatar"),
        group_id: row.get("group_id"),
        group_name: row.get("group_name"),
        group_admin_id: row.get("group_admin_id"),
        caption: row.get("caption"),
        created_at: row.get("created_at"),
    }
}
