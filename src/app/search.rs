use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::app::auth::user_from_row;
use crate::domain::group::{Group, GroupOverview, GroupPrivacy};
use crate::domain::user::PublicProfile;
use crate::infra::db::Db;

const SEARCH_LIMIT: i64 = 25;

#[derive(Clone)]
pub struct SearchService {
    db: Db,
}

impl SearchService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<PublicProfile>> {
        let pattern = format!("%{}%", escape_like_pattern(query));
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.bio, u.avatar, \
                    u.privacy::text AS privacy, u.created_at, \
                    (SELECT COUNT(*) FROM follows WHERE followee_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count \
             FROM users u \
             WHERE u.username ILIKE $1 ESCAPE '\\' \
                OR u.display_name ILIKE $1 ESCAPE '\\' \
             ORDER BY u.username \
             LIMIT $2",
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let user = user_from_row(&row)?;
            users.push(PublicProfile {
                id: user.id,
                username: user.username,
                display_name: user.display_name,
                bio: user.bio,
                avatar: user.avatar,
                privacy: user.privacy,
                created_at: user.created_at,
                followers_count: row.get("followers_count"),
                following_count: row.get("following_count"),
            });
        }

        Ok(users)
    }

    pub async fn search_groups(&self, viewer_id: Uuid, query: &str) -> Result<Vec<GroupOverview>> {
        let pattern = format!("%{}%", escape_like_pattern(query));
        let rows = sqlx::query(
            "SELECT g.id, g.name, g.description, g.privacy::text AS privacy, \
                    g.admin_id, g.created_at, \
                    (SELECT COUNT(*) FROM group_members WHERE group_id = g.id) AS member_count, \
                    EXISTS (SELECT 1 FROM group_members \
                            WHERE group_id = g.id AND user_id = $2) AS is_member \
             FROM groups g \
             WHERE g.name ILIKE $1 ESCAPE '\\' \
                OR g.description ILIKE $1 ESCAPE '\\' \
             ORDER BY g.name \
             LIMIT $3",
        )
        .bind(&pattern)
        .bind(viewer_id)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let privacy: String = row.get("privacy");
            let privacy = GroupPrivacy::from_db(&privacy)
                .ok_or_else(|| anyhow::anyhow!("unknown group privacy: {}", privacy))?;
            groups.push(GroupOverview {
                group: Group {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    privacy,
                    admin_id: row.get("admin_id"),
                    created_at: row.get("created_at"),
                },
                member_count: row.get("member_count"),
                is_member: row.get("is_member"),
            });
        }

        Ok(groups)
    }
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
