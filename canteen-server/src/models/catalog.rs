//! Canteen and menu item field validation

use chrono::NaiveTime;

use super::validation::{bounded_text, optional_text};
use super::ValidationError;

const MAX_CANTEEN_NAME_LEN: usize = 100;
const MAX_ITEM_NAME_LEN: usize = 120;
const MAX_CATEGORY_LEN: usize = 50;
const MAX_LOCATION_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Price ceiling in paise (₹1,00,000)
pub const MAX_PRICE_PAISE: i64 = 10_000_000;

/// Validated canteen name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanteenName(String);

impl CanteenName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "canteen name", MAX_CANTEEN_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated menu item name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemName(String);

impl ItemName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "item name", MAX_ITEM_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Menu category, stored lowercase so filters match regardless of case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category(String);

impl Category {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "category", MAX_CATEGORY_LEN).map(|c| Self(c.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Price in paise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(i64);

impl Price {
    pub fn new(paise: i64) -> Result<Self, ValidationError> {
        if !(0..=MAX_PRICE_PAISE).contains(&paise) {
            return Err(ValidationError::OutOfRange {
                field: "price_paise",
                min: 0,
                max: MAX_PRICE_PAISE,
            });
        }
        Ok(Self(paise))
    }

    pub fn paise(self) -> i64 {
        self.0
    }
}

pub fn location(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    optional_text(s, "location", MAX_LOCATION_LEN)
}

pub fn description(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    optional_text(s, "description", MAX_DESCRIPTION_LEN)
}

/// Opening and closing times must be given together and in order.
pub fn opening_hours(
    opens_at: Option<NaiveTime>,
    closes_at: Option<NaiveTime>,
) -> Result<Option<(NaiveTime, NaiveTime)>, ValidationError> {
    match (opens_at, closes_at) {
        (None, None) => Ok(None),
        (Some(open), Some(close)) if open < close => Ok(Some((open, close))),
        (Some(_), Some(_)) => Err(ValidationError::Inconsistent {
            reason: "opens_at must be before closes_at",
        }),
        _ => Err(ValidationError::Inconsistent {
            reason: "opens_at and closes_at must be set together",
        }),
    }
}
