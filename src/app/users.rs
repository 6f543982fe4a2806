use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::app::auth::user_from_row;
use crate::domain::user::{PublicProfile, User};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<PublicProfile>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.bio, u.avatar, \
                    u.privacy::text AS privacy, u.created_at, \
                    (SELECT COUNT(*) FROM follows WHERE followee_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count \
             FROM users u WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let profile = match row {
            Some(row) => {
                let user = user_from_row(&row)?;
                Some(PublicProfile {
                    id: user.id,
                    username: user.username,
                    display_name: user.display_name,
                    bio: user.bio,
                    avatar: user.avatar,
                    privacy: user.privacy,
                    created_at: user.created_at,
                    followers_count: row.get("followers_count"),
                    following_count: row.get("following_count"),
                })
            }
            None => None,
        };

        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
        display_name: Option<String>,
        bio: Option<String>,
        avatar: Option<String>,
        privacy: Option<crate::domain::user::Privacy>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users \
             SET username = COALESCE($2, username), \
                 display_name = COALESCE($3, display_name), \
                 bio = COALESCE($4, bio), \
                 avatar = COALESCE($5, avatar), \
                 privacy = COALESCE($6::user_privacy, privacy) \
             WHERE id = $1 \
             RETURNING id, username, display_name, bio, avatar, privacy::text AS privacy, created_at",
        )
        .bind(user_id)
        .bind(username)
        .bind(display_name)
        .bind(bio)
        .bind(avatar)
        .bind(privacy.map(|value| value.as_db()))
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }
}
