//! User account model.
//!
//! # Invariants
//! - `username` and `email` are unique across the store; email comparison
//!   is case-insensitive, including non-ASCII letters.
//! - `password_hash` is produced outside core and stored verbatim.

use crate::model::entity::{limit_text, require_text, EntityKind, UserId, ValidationError};
use serde::{Deserialize, Serialize};

pub const USERNAME_MAX_CHARS: usize = 64;
pub const EMAIL_MAX_CHARS: usize = 120;
pub const PASSWORD_HASH_MAX_CHARS: usize = 128;
pub const PERSON_NAME_MAX_CHARS: usize = 100;
pub const CHAT_FIELD_MAX_CHARS: usize = 100;

/// Persisted user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    /// Public chat handle shown on the profile page.
    pub chat_handle: Option<String>,
    /// Chat identifier the reminder bot delivers to. Set when the user links
    /// the bot.
    pub chat_id: Option<String>,
    pub notifications_enabled: bool,
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub chat_handle: Option<String>,
    pub chat_id: Option<String>,
    pub notifications_enabled: bool,
}

impl NewUser {
    /// Creates input with optional profile fields unset and notifications on.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: None,
            last_name: None,
            middle_name: None,
            chat_handle: None,
            chat_id: None,
            notifications_enabled: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(UserFields {
            username: &self.username,
            email: &self.email,
            password_hash: &self.password_hash,
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
            middle_name: self.middle_name.as_deref(),
            chat_handle: self.chat_handle.as_deref(),
            chat_id: self.chat_id.as_deref(),
        })
    }

    pub(crate) fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            chat_handle: self.chat_handle,
            chat_id: self.chat_id,
            notifications_enabled: self.notifications_enabled,
        }
    }
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(UserFields {
            username: &self.username,
            email: &self.email,
            password_hash: &self.password_hash,
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
            middle_name: self.middle_name.as_deref(),
            chat_handle: self.chat_handle.as_deref(),
            chat_id: self.chat_id.as_deref(),
        })
    }

    /// Returns the reminder destination when the user opted in and linked
    /// a chat.
    pub fn reminder_chat_id(&self) -> Option<&str> {
        if !self.notifications_enabled {
            return None;
        }
        self.chat_id.as_deref().filter(|value| !value.trim().is_empty())
    }
}

/// Canonical stored and compared form of an email address.
///
/// SQLite `NOCASE` folds ASCII only, so the full Unicode lowercase is
/// applied before any write or lookup.
pub fn fold_email(email: &str) -> String {
    email.trim().to_lowercase()
}

struct UserFields<'a> {
    username: &'a str,
    email: &'a str,
    password_hash: &'a str,
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
    middle_name: Option<&'a str>,
    chat_handle: Option<&'a str>,
    chat_id: Option<&'a str>,
}

fn validate_fields(fields: UserFields<'_>) -> Result<(), ValidationError> {
    const USER: EntityKind = EntityKind::User;

    require_text(USER, "username", fields.username, USERNAME_MAX_CHARS)?;
    require_text(USER, "email", fields.email, EMAIL_MAX_CHARS)?;
    require_text(
        USER,
        "password_hash",
        fields.password_hash,
        PASSWORD_HASH_MAX_CHARS,
    )?;
    limit_text(USER, "first_name", fields.first_name, PERSON_NAME_MAX_CHARS)?;
    limit_text(USER, "last_name", fields.last_name, PERSON_NAME_MAX_CHARS)?;
    limit_text(USER, "middle_name", fields.middle_name, PERSON_NAME_MAX_CHARS)?;
    limit_text(USER, "chat_handle", fields.chat_handle, CHAT_FIELD_MAX_CHARS)?;
    limit_text(USER, "chat_id", fields.chat_id, CHAT_FIELD_MAX_CHARS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{fold_email, NewUser};

    #[test]
    fn new_user_defaults_to_notifications_enabled() {
        let user = NewUser::new("alice", "alice@example.com", "hash");
        assert!(user.notifications_enabled);
        assert!(user.validate().is_ok());
    }

    #[test]
    fn fold_email_lowercases_non_ascii_letters() {
        assert_eq!(fold_email("  ÉLISE@Example.COM "), "élise@example.com");
    }

    #[test]
    fn blank_email_is_rejected() {
        let err = NewUser::new("alice", "  ", "hash").validate().unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn reminder_chat_id_requires_opt_in_and_linked_chat() {
        let mut user = NewUser::new("bob", "bob@example.com", "hash").into_user(1);
        assert_eq!(user.reminder_chat_id(), None);

        user.chat_id = Some("4242".to_string());
        assert_eq!(user.reminder_chat_id(), Some("4242"));

        user.notifications_enabled = false;
        assert_eq!(user.reminder_chat_id(), None);
    }
}
