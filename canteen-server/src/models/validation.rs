//! Validation error types

use std::fmt;

/// Validation error for request input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field is shorter than allowed
    TooShort { field: &'static str, min: usize },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., email)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Numeric value outside the accepted range
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Cross-field rule failed
    Inconsistent { reason: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooShort { field, min } => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::Inconsistent { reason } => f.write_str(reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim and length-check a free-text field.
pub(crate) fn bounded_text(
    s: &str,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(trimmed.to_owned())
}

/// Like [`bounded_text`], but blank input becomes `None`.
pub(crate) fn optional_text(
    s: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => bounded_text(text, field, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 100,
        };
        assert_eq!(err.to_string(), "name exceeds maximum length of 100 characters");

        let err = ValidationError::OutOfRange {
            field: "rating",
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "rating must be between 1 and 5");
    }

    #[test]
    fn bounded_text_trims() {
        assert_eq!(bounded_text("  Dosa  ", "name", 10).unwrap(), "Dosa");
        assert!(matches!(
            bounded_text("   ", "name", 10),
            Err(ValidationError::Empty { field: "name" })
        ));
        assert!(matches!(
            bounded_text("abcdefghijk", "name", 10),
            Err(ValidationError::TooLong { max: 10, .. })
        ));
    }

    #[test]
    fn optional_text_blank_is_none() {
        assert_eq!(optional_text(None, "comment", 10).unwrap(), None);
        assert_eq!(optional_text(Some("  "), "comment", 10).unwrap(), None);
        assert_eq!(
            optional_text(Some(" tasty "), "comment", 10).unwrap(),
            Some("tasty".to_string())
        );
    }
}
