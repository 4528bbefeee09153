//! Input validation utilities
//!
//! Provides normalization for user-supplied identifiers:
//! - Phone numbers shared through the contact button
//! - Display names used in greetings

use thiserror::Error;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Phone number is empty or contains no digits after normalization
    #[error("Invalid phone number: {0:?}")]
    InvalidPhone(String),
}

/// Longest phone number accepted (E.164 allows 15 digits)
const MAX_PHONE_DIGITS: usize = 15;

/// Normalizes a phone number to `+<digits>`.
///
/// Telegram reports contact phones with or without the leading `+`, and
/// manually entered contacts may carry spaces, dashes or parentheses. The
/// normalized form is the directory key, so the same person registering
/// twice always hits the same row.
///
/// # Examples
/// ```
/// use photoconv::core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+1 (000) 000-0001").unwrap(), "+10000000001");
/// assert_eq!(normalize_phone("10000000001").unwrap(), "+10000000001");
/// assert!(normalize_phone("call me").is_err());
/// ```
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let only_formatting = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'));

    if digits.is_empty() || digits.len() > MAX_PHONE_DIGITS || !only_formatting {
        return Err(ValidationError::InvalidPhone(raw.to_string()));
    }

    Ok(format!("+{}", digits))
}

/// Returns a display name, falling back when the platform gave none.
pub fn display_name(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "friend"
    } else {
        trimmed
    }
}
