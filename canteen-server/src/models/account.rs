//! Account field validation: email, password, name, phone

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::validation::bounded_text;
use super::ValidationError;

const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_NAME_LEN: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$")
        .expect("invalid email regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("invalid phone regex"));

/// Validated, lowercased email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Trims and lowercases before matching `local@domain.tld`.
    ///
    /// ```
    /// use canteen_server::models::Email;
    ///
    /// assert_eq!(Email::new(" Asha@Campus.EDU ").unwrap().as_str(), "asha@campus.edu");
    /// assert!(Email::new("not-an-email").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }

        if normalized.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        if !EMAIL_RE.is_match(&normalized) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must look like name@domain.tld",
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plaintext password accepted for hashing. Debug output is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let len = s.chars().count();

        if len < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "password",
                min: MIN_PASSWORD_LEN,
            });
        }

        if len > MAX_PASSWORD_LEN {
            return Err(ValidationError::TooLong {
                field: "password",
                max: MAX_PASSWORD_LEN,
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

/// Display name for any account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "name", MAX_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Phone number: 10-15 digits, optional leading `+`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phone(String);

impl Phone {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let compact: String = s.chars().filter(|c| !matches!(c, ' ' | '-')).collect();

        if compact.is_empty() {
            return Err(ValidationError::Empty { field: "phone" });
        }

        if !PHONE_RE.is_match(&compact) {
            return Err(ValidationError::InvalidFormat {
                field: "phone",
                reason: "must be 10-15 digits with an optional leading +",
            });
        }

        Ok(Self(compact))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalizes() {
        let email = Email::new("  Ravi.K@Uni.AC.in ").unwrap();
        assert_eq!(email.as_str(), "ravi.k@uni.ac.in");
    }

    #[test]
    fn email_rejects_garbage() {
        assert!(matches!(Email::new(""), Err(ValidationError::Empty { .. })));
        assert!(matches!(
            Email::new("ravi@localhost"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            Email::new("two@@signs.com"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn password_length_bounds() {
        assert!(matches!(
            Password::new("short"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
        assert!(Password::new("longenough").is_ok());
        assert!(matches!(
            Password::new(&"p".repeat(129)),
            Err(ValidationError::TooLong { max: 128, .. })
        ));
    }

    #[test]
    fn password_debug_is_redacted() {
        let pw = Password::new("hunter2hunter2").unwrap();
        assert!(!format!("{:?}", pw).contains("hunter2"));
    }

    #[test]
    fn phone_accepts_separators() {
        assert_eq!(Phone::new("+91 98765-43210").unwrap().as_str(), "+919876543210");
        assert!(Phone::new("12345").is_err());
        assert!(Phone::new("98765abcde").is_err());
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(PersonName::new("  Meera ").unwrap().as_str(), "Meera");
        assert!(PersonName::new("").is_err());
    }
}
