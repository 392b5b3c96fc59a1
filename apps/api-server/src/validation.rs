//! Field validation shared by the handlers.

use std::sync::LazyLock;

use entities::{EventCategory, ParseCategoryError};
use regex::Regex;

use crate::error::{ServerError, ServerResult};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 50;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Returns the trimmed value of a required text field.
pub fn required_text(value: Option<String>, field: &str) -> ServerResult<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ServerError::InvalidRequest(format!("{field} is required"))),
    }
}

/// Validates and trims a username.
pub fn username(value: Option<String>) -> ServerResult<String> {
    let username = required_text(value, "username")?;
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ServerError::InvalidRequest(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    Ok(username)
}

/// Validates an email address and returns it lowercased.
pub fn email(value: Option<String>) -> ServerResult<String> {
    let email = required_text(value, "email")?.to_lowercase();
    if !EMAIL_REGEX.is_match(&email) {
        return Err(ServerError::InvalidRequest(
            "email is not a valid email address".to_string(),
        ));
    }
    Ok(email)
}

/// Validates a new password. Passwords are not trimmed.
pub fn password(value: Option<String>, field: &str) -> ServerResult<String> {
    match value {
        Some(password) if password.chars().count() >= MIN_PASSWORD_LENGTH => Ok(password),
        Some(_) => Err(ServerError::InvalidRequest(format!(
            "{field} must be at least {MIN_PASSWORD_LENGTH} characters"
        ))),
        None => Err(ServerError::InvalidRequest(format!("{field} is required"))),
    }
}

/// Validates an absolute http(s) URL.
pub fn http_url(value: &str, field: &str) -> ServerResult<String> {
    let trimmed = value.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ServerError::InvalidRequest(format!(
            "{field} must be an http(s) URL"
        ))),
    }
}

/// Parses a category name, case-insensitively.
pub fn category(value: &str) -> ServerResult<EventCategory> {
    value
        .parse()
        .map_err(|e: ParseCategoryError| ServerError::InvalidRequest(e.to_string()))
}

/// A `?category=` restriction on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No restriction.
    Any,
    /// Only this category.
    Only(EventCategory),
    /// A name no category has. Nothing matches.
    Unmatched,
}

impl CategoryFilter {
    /// Returns true if an item of `category` passes the filter.
    pub fn matches(&self, category: EventCategory) -> bool {
        match self {
            Self::Any => true,
            Self::Only(only) => *only == category,
            Self::Unmatched => false,
        }
    }
}

/// Parses an optional category filter. Blank values mean no filter.
pub fn category_filter(value: Option<&str>) -> CategoryFilter {
    match value.map(str::trim) {
        None | Some("") => CategoryFilter::Any,
        Some(raw) => raw
            .parse()
            .map_or(CategoryFilter::Unmatched, CategoryFilter::Only),
    }
}

/// Validates an event capacity.
pub fn max_participants(value: i64) -> ServerResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|max| *max >= 1)
        .ok_or_else(|| {
            ServerError::InvalidRequest("max_participants must be at least 1".to_string())
        })
}
