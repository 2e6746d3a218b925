//! Users, workspaces and membership rows read by the access checkpoint.

use super::access::{authorize, authorize_owner};
use super::rows::{
    get_user, parse_member_row, parse_workspace_row, require_user, require_workspace,
};
use super::{Database, new_id, now_ms};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::types::{User, Workspace, WorkspaceMember, WorkspaceRole};
use rusqlite::{OptionalExtension, params};
use tracing::info;

impl Database {
    /// Register a user, or refresh the display name of an existing one.
    pub fn upsert_user(&self, id: Option<String>, name: &str, email: Option<&str>) -> ApiResult<User> {
        if name.trim().is_empty() {
            return Err(ApiError::missing_field("name"));
        }
        let user_id = id.unwrap_or_else(new_id);
        let now = now_ms();

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
                params![&user_id, name, email, now],
            )?;
            require_user(tx, &user_id)
        })
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &str) -> ApiResult<Option<User>> {
        self.with_conn(|conn| get_user(conn, user_id))
    }

    /// Create a workspace owned by `owner_id`; the owner is recorded as an OWNER member.
    pub fn create_workspace(&self, name: &str, owner_id: &str) -> ApiResult<Workspace> {
        if name.trim().is_empty() {
            return Err(ApiError::missing_field("name"));
        }
        let workspace_id = new_id();
        let now = now_ms();

        let workspace = self.with_tx(|tx| {
            require_user(tx, owner_id)?;
            tx.execute(
                "INSERT INTO workspaces (id, name, owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![&workspace_id, name, owner_id, now],
            )?;
            tx.execute(
                "INSERT INTO workspace_members (id, user_id, workspace_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new_id(), owner_id, &workspace_id, WorkspaceRole::Owner.as_str(), now],
            )?;
            require_workspace(tx, &workspace_id)
        })?;

        info!(workspace_id = %workspace.id, owner_id, "Created workspace");
        Ok(workspace)
    }

    /// Get a workspace the user may access.
    pub fn get_workspace(&self, workspace_id: &str, user_id: &str) -> ApiResult<Workspace> {
        self.with_conn(|conn| authorize(conn, workspace_id, user_id))
    }

    /// Workspaces the user owns or belongs to, oldest first.
    pub fn list_workspaces(&self, user_id: &str) -> ApiResult<Vec<Workspace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT w.* FROM workspaces w
                 LEFT JOIN workspace_members m ON m.workspace_id = w.id
                 WHERE w.owner_id = ?1 OR m.user_id = ?1
                 ORDER BY w.created_at ASC, w.id ASC",
            )?;
            let workspaces = stmt
                .query_map(params![user_id], parse_workspace_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(workspaces)
        })
    }

    /// Rename a workspace. Owner-only.
    pub fn update_workspace(&self, workspace_id: &str, name: &str, user_id: &str) -> ApiResult<Workspace> {
        if name.trim().is_empty() {
            return Err(ApiError::missing_field("name"));
        }

        let workspace = self.with_tx(|tx| {
            authorize_owner(tx, workspace_id, user_id, "update the workspace")?;
            tx.execute(
                "UPDATE workspaces SET name = ?2, updated_at = ?3 WHERE id = ?1",
                params![workspace_id, name, now_ms()],
            )?;
            require_workspace(tx, workspace_id)
        })?;

        info!(workspace_id, "Renamed workspace");
        Ok(workspace)
    }

    /// Membership rows of a workspace.
    pub fn list_members(&self, workspace_id: &str, user_id: &str) -> ApiResult<Vec<WorkspaceMember>> {
        self.with_conn(|conn| {
            authorize(conn, workspace_id, user_id)?;
            let mut stmt = conn.prepare(
                "SELECT * FROM workspace_members WHERE workspace_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let members = stmt
                .query_map(params![workspace_id], parse_member_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(members)
        })
    }

    /// Add a member. Owner-only.
    pub fn add_member(
        &self,
        workspace_id: &str,
        actor_id: &str,
        member_id: &str,
    ) -> ApiResult<WorkspaceMember> {
        let now = now_ms();

        let member = self.with_tx(|tx| {
            authorize_owner(tx, workspace_id, actor_id, "add members")?;
            require_user(tx, member_id)?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2)",
                params![workspace_id, member_id],
                |row| row.get(0),
            )?;
            if exists {
                return Err(ApiError::new(
                    ErrorCode::AlreadyMember,
                    format!("User {} is already a member", member_id),
                )
                .with_field("userId"));
            }

            let id = new_id();
            tx.execute(
                "INSERT INTO workspace_members (id, user_id, workspace_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&id, member_id, workspace_id, WorkspaceRole::Member.as_str(), now],
            )?;
            Ok(tx.query_row(
                "SELECT * FROM workspace_members WHERE id = ?1",
                params![&id],
                parse_member_row,
            )?)
        })?;

        info!(workspace_id, member_id, "Added workspace member");
        Ok(member)
    }

    /// Remove a member. Owner-only; the owner's own membership cannot be removed.
    pub fn remove_member(&self, workspace_id: &str, actor_id: &str, member_id: &str) -> ApiResult<()> {
        self.with_tx(|tx| {
            let workspace = authorize_owner(tx, workspace_id, actor_id, "remove members")?;
            if workspace.owner_id == member_id {
                return Err(ApiError::invalid_value(
                    "userId",
                    "The workspace owner cannot be removed",
                ));
            }

            let row: Option<String> = tx
                .query_row(
                    "SELECT id FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
                    params![workspace_id, member_id],
                    |row| row.get(0),
                )
                .optional()?;
            let row_id = row.ok_or_else(|| {
                ApiError::not_found(ErrorCode::MemberNotFound, "Member", member_id)
            })?;

            tx.execute("DELETE FROM workspace_members WHERE id = ?1", params![row_id])?;
            Ok(())
        })?;

        info!(workspace_id, member_id, "Removed workspace member");
        Ok(())
    }

    /// Drop the caller's own membership. The owner cannot leave.
    pub fn leave_workspace(&self, workspace_id: &str, user_id: &str) -> ApiResult<()> {
        self.with_tx(|tx| {
            let workspace = authorize(tx, workspace_id, user_id)?;
            if workspace.owner_id == user_id {
                return Err(ApiError::new(
                    ErrorCode::OwnerOnly,
                    "Workspace owners cannot leave their own workspace",
                ));
            }
            tx.execute(
                "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
                params![workspace_id, user_id],
            )?;
            Ok(())
        })?;

        info!(workspace_id, user_id, "Left workspace");
        Ok(())
    }

    /// Delete a workspace and everything in it. Owner-only.
    pub fn delete_workspace(&self, workspace_id: &str, user_id: &str) -> ApiResult<()> {
        self.with_tx(|tx| {
            authorize_owner(tx, workspace_id, user_id, "delete the workspace")?;
            tx.execute("DELETE FROM workspaces WHERE id = ?1", params![workspace_id])?;
            Ok(())
        })?;

        info!(workspace_id, "Deleted workspace");
        Ok(())
    }
}
