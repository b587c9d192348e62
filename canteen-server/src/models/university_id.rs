//! University ID parsing
//!
//! IDs are an alphanumeric prefix ending in a letter, followed by a numeric
//! roll number: `21BCE0042` splits into prefix `21BCE` and roll `42`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

const MAX_UNIVERSITY_ID_LEN: usize = 32;

static UNIVERSITY_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Z0-9]*[A-Z])(?P<roll>[0-9]+)$").expect("invalid university id regex")
});

/// Validated university ID, stored upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniversityId {
    raw: String,
    prefix_len: usize,
    roll: i64,
}

impl UniversityId {
    /// ```
    /// use canteen_server::models::UniversityId;
    ///
    /// let id = UniversityId::new("21bce0042").unwrap();
    /// assert_eq!(id.as_str(), "21BCE0042");
    /// assert_eq!(id.parts(), ("21BCE", 42));
    /// assert!(UniversityId::new("0042").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let raw = s.trim().to_uppercase();

        if raw.is_empty() {
            return Err(ValidationError::Empty {
                field: "university_id",
            });
        }

        if raw.len() > MAX_UNIVERSITY_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "university_id",
                max: MAX_UNIVERSITY_ID_LEN,
            });
        }

        let caps = UNIVERSITY_ID_RE
            .captures(&raw)
            .ok_or(ValidationError::InvalidFormat {
                field: "university_id",
                reason: "must be a letter-terminated prefix followed by a roll number",
            })?;

        let prefix_len = caps["prefix"].len();
        // Long digit runs overflow i64; treat them as malformed rather than wrap.
        let roll = caps["roll"]
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "university_id",
                reason: "roll number is too large",
            })?;

        Ok(Self {
            raw,
            prefix_len,
            roll,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `(prefix, roll number)`
    pub fn parts(&self) -> (&str, i64) {
        (&self.raw[..self.prefix_len], self.roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_prefix_and_roll() {
        let id = UniversityId::new("2021CS1234").unwrap();
        assert_eq!(id.parts(), ("2021CS", 1234));

        let id = UniversityId::new("ME7").unwrap();
        assert_eq!(id.parts(), ("ME", 7));
    }

    #[test]
    fn uppercases_and_trims() {
        let id = UniversityId::new("  21bce0042 ").unwrap();
        assert_eq!(id.as_str(), "21BCE0042");
    }

    #[test]
    fn rejects_missing_parts() {
        assert!(matches!(
            UniversityId::new("12345"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            UniversityId::new("BCE"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            UniversityId::new("21-BCE-42"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(UniversityId::new(" "), Err(ValidationError::Empty { .. })));
    }

    #[test]
    fn rejects_overflowing_roll() {
        assert!(UniversityId::new("CS99999999999999999999").is_err());
    }
}
