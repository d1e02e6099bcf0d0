//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist user accounts and reminder settings.
//! - Delete a user together with every project it owns.
//!
//! # Invariants
//! - Duplicate username/email fails with `UniqueViolation` and leaves the
//!   store unchanged.
//! - Emails are stored folded, so writes and lookups are case-insensitive
//!   for non-ASCII letters too.

use crate::model::entity::{limit_text, EntityKind, UserId};
use crate::model::user::{fold_email, NewUser, User, CHAT_FIELD_MAX_CHARS};
use crate::repo::cascade::{self, DeleteSummary};
use crate::repo::{
    begin_write, bool_to_int, ensure_connection_ready, ensure_exists, parse_flag, update_row,
    RepoError, RepoResult,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    password_hash,
    first_name,
    last_name,
    middle_name,
    chat_handle,
    chat_id,
    notifications_enabled
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Resolves the account linked to a chat, used by the reminder bot.
    fn find_by_chat_id(&self, chat_id: &str) -> RepoResult<Option<User>>;
    /// Users with notifications enabled and a linked chat, ordered by id.
    fn list_reminder_recipients(&self) -> RepoResult<Vec<User>>;
    fn update_user(&self, user: &User) -> RepoResult<()>;
    /// Links or unlinks the reminder chat; `None` or blank unlinks.
    fn set_chat_id(&self, id: UserId, chat_id: Option<&str>) -> RepoResult<()>;
    fn set_notifications_enabled(&self, id: UserId, enabled: bool) -> RepoResult<()>;
    /// Deletes the user and everything it owns in one transaction.
    fn delete_user(&self, id: UserId) -> RepoResult<DeleteSummary>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn find_one(&self, clause: &str, value: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE {clause} ORDER BY id LIMIT 1;"))?;
        let user = stmt
            .query_row([value], |row| Ok(parse_user_row(row)))
            .optional()?;
        user.transpose()
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let user = NewUser {
            email: fold_email(&user.email),
            ..user.clone()
        };
        user.validate()?;

        let tx = begin_write(self.conn)?;
        tx.execute(
            "INSERT INTO users (
                username,
                email,
                password_hash,
                first_name,
                last_name,
                middle_name,
                chat_handle,
                chat_id,
                notifications_enabled
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                user.username.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.middle_name.as_deref(),
                user.chat_handle.as_deref(),
                user.chat_id.as_deref(),
                bool_to_int(user.notifications_enabled),
            ],
        )
        .map_err(|err| RepoError::from_write(EntityKind::User, err))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("event=user_create module=repo status=ok user_id={id}");
        Ok(user.into_user(id))
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let user = stmt
            .query_row([id], |row| Ok(parse_user_row(row)))
            .optional()?;
        user.transpose()
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one("username = ?1", username)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one("email = ?1 COLLATE NOCASE", &fold_email(email))
    }

    fn find_by_chat_id(&self, chat_id: &str) -> RepoResult<Option<User>> {
        self.find_one("chat_id = ?1", chat_id.trim())
    }

    fn list_reminder_recipients(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             WHERE notifications_enabled = 1
               AND chat_id IS NOT NULL
               AND trim(chat_id) <> ''
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;
        let email = fold_email(&user.email);

        let tx = begin_write(self.conn)?;
        let changed = tx
            .execute(
                "UPDATE users
                 SET
                    username = ?1,
                    email = ?2,
                    password_hash = ?3,
                    first_name = ?4,
                    last_name = ?5,
                    middle_name = ?6,
                    chat_handle = ?7,
                    chat_id = ?8,
                    notifications_enabled = ?9
                 WHERE id = ?10;",
                params![
                    user.username.as_str(),
                    email.as_str(),
                    user.password_hash.as_str(),
                    user.first_name.as_deref(),
                    user.last_name.as_deref(),
                    user.middle_name.as_deref(),
                    user.chat_handle.as_deref(),
                    user.chat_id.as_deref(),
                    bool_to_int(user.notifications_enabled),
                    user.id,
                ],
            )
            .map_err(|err| RepoError::from_write(EntityKind::User, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::User,
                id: user.id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn set_chat_id(&self, id: UserId, chat_id: Option<&str>) -> RepoResult<()> {
        let chat_id = chat_id.map(str::trim).filter(|value| !value.is_empty());
        limit_text(EntityKind::User, "chat_id", chat_id, CHAT_FIELD_MAX_CHARS)?;

        update_row(
            self.conn,
            EntityKind::User,
            id,
            "UPDATE users SET chat_id = ?1 WHERE id = ?2;",
            params![chat_id, id],
        )?;

        info!(
            "event=user_chat_link module=repo status=ok user_id={id} linked={}",
            chat_id.is_some()
        );
        Ok(())
    }

    fn set_notifications_enabled(&self, id: UserId, enabled: bool) -> RepoResult<()> {
        update_row(
            self.conn,
            EntityKind::User,
            id,
            "UPDATE users SET notifications_enabled = ?1 WHERE id = ?2;",
            params![bool_to_int(enabled), id],
        )
    }

    fn delete_user(&self, id: UserId) -> RepoResult<DeleteSummary> {
        let tx = begin_write(self.conn)?;
        ensure_exists(&tx, EntityKind::User, id)?;
        let summary = cascade::delete_user(&tx, id)?;
        tx.commit()?;

        info!(
            "event=user_delete module=repo status=ok user_id={id} projects={} rows={}",
            summary.projects,
            summary.total()
        );
        Ok(summary)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let user = User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        middle_name: row.get("middle_name")?,
        chat_handle: row.get("chat_handle")?,
        chat_id: row.get("chat_id")?,
        notifications_enabled: parse_flag(
            row.get("notifications_enabled")?,
            "users.notifications_enabled",
        )?,
    };
    user.validate()
        .map_err(|err| RepoError::InvalidData(format!("user {}: {err}", user.id)))?;
    Ok(user)
}
