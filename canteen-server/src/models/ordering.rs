//! Cart quantities and feedback values

use super::validation::optional_text;
use super::ValidationError;

const MAX_COMMENT_LEN: usize = 1000;

/// Cart line quantity, bounded by the configured per-line maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(n: i32, max: i32) -> Result<Self, ValidationError> {
        if n < 1 || n > max {
            return Err(ValidationError::OutOfRange {
                field: "quantity",
                min: 1,
                max: max as i64,
            });
        }
        Ok(Self(n))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Star rating, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating(i16);

impl Rating {
    pub fn new(n: i64) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&n) {
            return Err(ValidationError::OutOfRange {
                field: "rating",
                min: 1,
                max: 5,
            });
        }
        Ok(Self(n as i16))
    }

    pub fn get(self) -> i16 {
        self.0
    }
}

/// Optional feedback comment; blank input is dropped
pub fn comment(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    optional_text(s, "comment", MAX_COMMENT_LEN)
}
