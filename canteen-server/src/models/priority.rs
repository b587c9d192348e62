//! Priority-order eligibility
//!
//! A user may place a priority order while an exam they are registered for
//! is running. Registration is expressed as an ID range: every university
//! ID whose prefix matches the exam's prefix and whose roll number lies in
//! `[roll_start, roll_end]` is registered.

use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{UniversityId, ValidationError};

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]*[A-Z]$").expect("invalid exam prefix regex"));

/// The registered ID range and date window of one exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExamRange {
    pub id_prefix: String,
    pub roll_start: i64,
    pub roll_end: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

impl ExamRange {
    pub fn new(
        id_prefix: &str,
        roll_start: i64,
        roll_end: i64,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let id_prefix = id_prefix.trim().to_uppercase();

        if id_prefix.is_empty() {
            return Err(ValidationError::Empty { field: "id_prefix" });
        }
        if !PREFIX_RE.is_match(&id_prefix) {
            return Err(ValidationError::InvalidFormat {
                field: "id_prefix",
                reason: "must be alphanumeric and end with a letter",
            });
        }
        if roll_start < 0 || roll_start > roll_end {
            return Err(ValidationError::Inconsistent {
                reason: "roll_start must be non-negative and not exceed roll_end",
            });
        }
        if starts_on > ends_on {
            return Err(ValidationError::Inconsistent {
                reason: "starts_on must not be after ends_on",
            });
        }

        Ok(Self {
            id_prefix,
            roll_start,
            roll_end,
            starts_on,
            ends_on,
        })
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.starts_on <= day && day <= self.ends_on
    }

    pub fn covers(&self, id: &UniversityId) -> bool {
        let (prefix, roll) = id.parts();
        prefix.eq_ignore_ascii_case(&self.id_prefix)
            && (self.roll_start..=self.roll_end).contains(&roll)
    }
}

impl AsRef<ExamRange> for ExamRange {
    fn as_ref(&self) -> &ExamRange {
        self
    }
}

/// Why a priority order was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
    /// The account has no university ID on file
    NoUniversityId,
    /// No exam is running today
    NoActiveExam,
    /// Exams are running, but none covers this ID
    OutOfRange,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoUniversityId => "a university ID is required for priority orders",
            Self::NoActiveExam => "no exam is running today",
            Self::OutOfRange => "university ID is not registered for any running exam",
        })
    }
}

/// Find the first exam running on `today` that covers `id`.
pub fn check_eligibility<'a, T: AsRef<ExamRange>>(
    id: Option<&UniversityId>,
    exams: &'a [T],
    today: NaiveDate,
) -> Result<&'a T, Ineligible> {
    let id = id.ok_or(Ineligible::NoUniversityId)?;

    let mut active = exams
        .iter()
        .filter(|exam| exam.as_ref().is_active_on(today))
        .peekable();

    if active.peek().is_none() {
        return Err(Ineligible::NoActiveExam);
    }

    active
        .find(|exam| exam.as_ref().covers(id))
        .ok_or(Ineligible::OutOfRange)
}
