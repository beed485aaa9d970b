//! Validation error types and shared field checks

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Validation error for domain models
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., phone number)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Numeric value outside the allowed range
    OutOfRange { field: &'static str, min: f64, max: Option<f64> },

    /// Request is well-formed but violates a domain rule
    Rule { message: String },
}

impl ValidationError {
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::OutOfRange { field, min, max: Some(max) } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::OutOfRange { field, min, max: None } => {
                write!(f, "{} must be at least {}", field, min)
            }
            Self::Rule { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for ValidationError {}

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("invalid url regex"));

/// Require a trimmed, non-empty string of at most `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    max_len(field, trimmed, max)?;
    Ok(trimmed.to_owned())
}

/// Length check counted in characters, not bytes.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Same as [`max_len`] for optional fields.
pub fn optional_max_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

/// Inclusive range check; `max = None` means unbounded above.
pub fn in_range(field: &'static str, value: f64, min: f64, max: Option<f64>) -> Result<(), ValidationError> {
    let above_max = max.map(|m| value > m).unwrap_or(false);
    if value.is_nan() || value < min || above_max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

/// http(s) URL check.
pub fn url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if !URL_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be an http(s) URL",
        });
    }
    Ok(())
}
