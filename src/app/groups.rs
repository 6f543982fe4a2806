use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::group::{Group, GroupOverview, GroupPrivacy};
use crate::domain::user::UserSummary;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct GroupService {
    db: Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Joined,
    AlreadyMember,
    PrivateGroup,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveResult {
    Left,
    NotMember,
    AdminCannotLeave,
}

impl GroupService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create the group and the creator's membership row in one transaction;
    /// the admin is always a member.
    pub async fn create_group(
        &self,
        creator_id: Uuid,
        name: String,
        description: Option<String>,
        privacy: GroupPrivacy,
    ) -> Result<Group> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "INSERT INTO groups (name, description, privacy, admin_id) \
             VALUES ($1, $2, $3::group_privacy, $4) \
             RETURNING id, name, description, privacy::text AS privacy, admin_id, created_at",
        )
        .bind(name)
        .bind(description)
        .bind(privacy.as_db())
        .bind(creator_id)
        .fetch_one(&mut *tx)
        .await?;

        let group = group_from_row(&row)?;

        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(group.id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    pub async fn list_memberships(&self, user_id: Uuid) -> Result<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT g.id, g.name, g.description, g.privacy::text AS privacy, \
                    g.admin_id, g.created_at \
             FROM group_members m \
             JOIN groups g ON g.id = m.group_id \
             WHERE m.user_id = $1 \
             ORDER BY m.joined_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(group_from_row).collect()
    }

    pub async fn get_overview(&self, group_id: Uuid, viewer_id: Uuid) -> Result<Option<GroupOverview>> {
        let row = sqlx::query(
            "SELECT g.id, g.name, g.description, g.privacy::text AS privacy, \
                    g.admin_id, g.created_at, \
                    (SELECT COUNT(*) FROM group_members WHERE group_id = g.id) AS member_count, \
                    EXISTS (SELECT 1 FROM group_members \
                            WHERE group_id = g.id AND user_id = $2) AS is_member \
             FROM groups g WHERE g.id = $1",
        )
        .bind(group_id)
        .bind(viewer_id)
        .fetch_optional(self.db.pool())
        .await?;

        let overview = match row {
            Some(row) => Some(GroupOverview {
                group: group_from_row(&row)?,
                member_count: row.get("member_count"),
                is_member: row.get("is_member"),
            }),
            None => None,
        };

        Ok(overview)
    }

    pub async fn list_members(&self, group_id: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.avatar \
             FROM group_members m \
             JOIN users u ON u.id = m.user_id \
             WHERE m.group_id = $1 \
             ORDER BY m.joined_at",
        )
        .bind(group_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserSummary {
                id: row.get("id"),
                username: row.get("username"),
                avatar: row.get("avatar"),
            })
            .collect())
    }

    /// Joining is instant for public groups only. Private groups have no
    /// approval workflow, so the join is rejected outright.
    pub async fn join(&self, user_id: Uuid, group_id: Uuid) -> Result<JoinResult> {
        let privacy: Option<String> =
            sqlx::query_scalar("SELECT privacy::text FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(self.db.pool())
                .await?;

        let privacy = match privacy.as_deref().and_then(GroupPrivacy::from_db) {
            Some(privacy) => privacy,
            None => return Ok(JoinResult::NotFound),
        };

        if privacy == GroupPrivacy::Private {
            return Ok(JoinResult::PrivateGroup);
        }

        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(JoinResult::Joined)
        } else {
            Ok(JoinResult::AlreadyMember)
        }
    }

    pub async fn leave(&self, user_id: Uuid, group_id: Uuid) -> Result<LeaveResult> {
        let admin_id: Option<Uuid> =
            sqlx::query_scalar("SELECT admin_id FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(self.db.pool())
                .await?;

        if admin_id == Some(user_id) {
            return Ok(LeaveResult::AdminCannotLeave);
        }

        let result = sqlx::query(
            "DELETE FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(LeaveResult::Left)
        } else {
            Ok(LeaveResult::NotMember)
        }
    }

}

fn group_from_row(row: &sqlx::postgres::PgRow) -> Result<Group> {
    let privacy: String = row.get("privacy");
    let privacy = GroupPrivacy::from_db(&privacy)
        .ok_or_else(|| anyhow::anyhow!("unknown group privacy: {}", privacy))?;
    Ok(Group {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        privacy,
        admin_id: row.get("admin_id"),
        created_at: row.get("created_at"),
    })
}
