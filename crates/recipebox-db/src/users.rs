use anyhow::Result;
use recipebox_types::models::Role;
use rusqlite::{Connection, Row};

use crate::models::{NewUser, ProfilePatch, ProfileUpdate, UserRow};
use crate::{Database, OptionalExt, is_unique_violation, now_timestamp};

const USER_COLUMNS: &str = "id, name, email, password, role, avatar, created_at, updated_at";

impl Database {
    /// Inserts a user. Returns `None` when the email is already registered.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, password, role, avatar, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.avatar,
                    now
                ],
            );
            match inserted {
                Ok(_) => query_user(conn, "id", user.id),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn update_profile(&self, id: &str, patch: &ProfilePatch<'_>) -> Result<ProfileUpdate> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    email = COALESCE(?3, email),
                    avatar = COALESCE(?4, avatar),
                    password = COALESCE(?5, password),
                    updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.name,
                    patch.email,
                    patch.avatar,
                    patch.password_hash,
                    now_timestamp()
                ],
            );
            match updated {
                Ok(0) => Ok(ProfileUpdate::NotFound),
                Ok(_) => Ok(query_user(tx, "id", id)?
                    .map(ProfileUpdate::Updated)
                    .unwrap_or(ProfileUpdate::NotFound)),
                Err(e) if is_unique_violation(&e) => Ok(ProfileUpdate::EmailTaken),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserRow>> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, role.as_str(), now_timestamp()],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_user(tx, "id", id)
        })
    }

    /// Removes the user and, through cascades, their likes and stars.
    /// Reviews and messages they wrote are kept.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    /// Newest-first page of users plus the total user count.
    pub fn list_users(&self, limit: u32, offset: u64) -> Result<(Vec<UserRow>, u64)> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset as i64], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok((rows, total as u64))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        avatar: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
