//! Core use-case services.
//!
//! # Responsibility
//! - Normalize caller input (trim, defaults, enum parsing) before it reaches
//!   repositories.
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep web/bot layers decoupled from storage details.

pub mod habit_service;
pub mod project_service;
pub mod task_service;
pub mod user_service;

/// Trims an optional text field; blank becomes `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::normalize_optional;

    #[test]
    fn normalize_optional_drops_blank_values() {
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" notes ".to_string())),
            Some("notes".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }
}
