//! Domain model for the task board entity store.
//!
//! # Responsibility
//! - Define the records persisted by repositories and returned to callers.
//! - Own field-level validation rules shared by every write path.
//!
//! # Invariants
//! - Every child record references exactly one parent id.
//! - Records returned from storage have passed `validate()`.

pub mod entity;
pub mod project;
pub mod repeating;
pub mod task;
pub mod user;
