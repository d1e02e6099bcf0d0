//! User account use-case service.
//!
//! # Invariants
//! - Usernames are trimmed; emails are trimmed and lowercased before
//!   persistence.
//! - Chat linking goes through the username the user typed into the bot.

use crate::model::entity::{EntityKind, UserId, ValidationError};
use crate::model::user::{fold_email, NewUser, User};
use crate::repo::cascade::DeleteSummary;
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::normalize_optional;

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub chat_handle: Option<String>,
}

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new account. `password_hash` must already be hashed.
    ///
    /// Fails with `UniqueViolation` when username or email is taken.
    pub fn register(&self, user: NewUser) -> RepoResult<User> {
        let user = NewUser {
            username: user.username.trim().to_string(),
            email: fold_email(&user.email),
            first_name: normalize_optional(user.first_name),
            last_name: normalize_optional(user.last_name),
            middle_name: normalize_optional(user.middle_name),
            chat_handle: normalize_optional(user.chat_handle),
            chat_id: normalize_optional(user.chat_id),
            ..user
        };
        self.repo.create_user(&user)
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<User> {
        self.repo.get_user(id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::User,
            id,
        })
    }

    /// Resolves a login identifier that may be a username or an email.
    pub fn find_for_login(&self, identifier: &str) -> RepoResult<Option<User>> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            return self.repo.find_by_email(identifier);
        }
        self.repo.find_by_username(identifier)
    }

    pub fn update_profile(&self, id: UserId, profile: ProfileUpdate) -> RepoResult<User> {
        let mut user = self.get_user(id)?;
        user.first_name = normalize_optional(profile.first_name);
        user.last_name = normalize_optional(profile.last_name);
        user.middle_name = normalize_optional(profile.middle_name);
        user.chat_handle = normalize_optional(profile.chat_handle);
        self.repo.update_user(&user)?;
        Ok(user)
    }

    /// Links a bot chat to the account with `username`.
    pub fn link_chat(&self, username: &str, chat_id: &str) -> RepoResult<User> {
        let username = username.trim().trim_start_matches('@');
        let user = self.repo.find_by_username(username)?.ok_or_else(|| {
            RepoError::Validation(ValidationError::new(
                EntityKind::User,
                "username",
                format!("no account named `{username}`"),
            ))
        })?;
        self.repo.set_chat_id(user.id, Some(chat_id))?;
        self.get_user(user.id)
    }

    pub fn unlink_chat(&self, id: UserId) -> RepoResult<()> {
        self.repo.set_chat_id(id, None)
    }

    pub fn set_notifications_enabled(&self, id: UserId, enabled: bool) -> RepoResult<()> {
        self.repo.set_notifications_enabled(id, enabled)
    }

    /// Deletes the account with all owned projects.
    pub fn delete_account(&self, id: UserId) -> RepoResult<DeleteSummary> {
        self.repo.delete_user(id)
    }
}
