//! Error type shared by the tally-core modules.

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unknown period '{0}' (expected day, week, month or year)")]
    UnknownPeriod(String),

    #[error("malformed transaction record {record}: {reason}")]
    MalformedTransaction { record: String, reason: String },

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("transaction description must not be empty")]
    EmptyDescription,

    #[error("due date {due} is in the past (today is {today})")]
    DueDateInPast {
        due: chrono::NaiveDate,
        today: chrono::NaiveDate,
    },

    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),

    #[error("unsupported currency '{0}'")]
    UnsupportedCurrency(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid local datetime '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },

    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("settings storage failed for '{key}': {message}")]
    Settings { key: String, message: String },

    #[error("invalid shopping item: {0}")]
    InvalidItem(String),

    #[error("invalid shopping list: {0}")]
    InvalidList(String),

    #[error("adding this item brings the total to {total}, over the budget of {budget}")]
    OverBudget { total: Decimal, budget: Decimal },

    #[error("shopping item not found: {0}")]
    ItemNotFound(String),

    #[error("shopping list is not active")]
    ListNotActive,
}

impl Error {
    pub(crate) fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedTransaction {
            record: record.into(),
            reason: reason.into(),
        }
    }
}
