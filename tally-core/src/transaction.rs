//! Transaction types: the validated value the engine aggregates, the loose
//! document shape a store hands back, and user input for new entries.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::time::local_date;

/// Largest magnitude, in currency units, accepted for a single amount.
/// Sums of many such amounts stay far inside `Decimal`'s range.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

/// True when `amount` is within [`MAX_AMOUNT_UNITS`] either side of zero.
pub fn amount_in_range(amount: Decimal) -> bool {
    amount.abs() <= Decimal::from(MAX_AMOUNT_UNITS)
}

/// Identity of the user owning a record. Always passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
}

/// A single signed monetary event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: UserId,
    pub description: String,
    /// Positive = income, zero or negative = expense
    pub amount: Decimal,
    /// When the economic event happened
    pub date: DateTime<Utc>,
    /// Free-text label; empty means "no category"
    pub category: Option<String>,
    pub status: TransactionStatus,
    /// Set for future payments
    pub due_date: Option<DateTime<Utc>>,
    /// Item breakdown for purchases recorded from a shopping list
    pub detailed_description: Option<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        user_id: UserId,
        description: impl Into<String>,
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id,
            description: description.into(),
            amount,
            date,
            category: None,
            status: TransactionStatus::Completed,
            due_date: None,
            detailed_description: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Mark as a pending future payment due at `due`.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self.status = TransactionStatus::Pending;
        self
    }

    /// Returns true if this is income (positive amount)
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if this counts as an expense; zero amounts included
    pub fn is_expense(&self) -> bool {
        !self.is_income()
    }

    /// Magnitude contributed to expense totals
    pub fn expense_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// Category used for grouping; blank or missing falls back to `fallback`.
    pub fn category_label<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => fallback,
        }
    }

    pub fn is_future_payment(&self) -> bool {
        self.due_date.is_some() && self.status == TransactionStatus::Pending
    }

    /// Validate a batch of store records. The first malformed record fails
    /// the whole batch.
    pub fn from_records(
        records: impl IntoIterator<Item = TransactionRecord>,
    ) -> Result<Vec<Transaction>> {
        records.into_iter().map(Transaction::try_from).collect()
    }
}

/// Instant as found in stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDate {
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// Document-store timestamp object
    Timestamp {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    /// RFC 3339 text
    Text(String),
}

impl RecordDate {
    pub fn to_utc(&self) -> std::result::Result<DateTime<Utc>, String> {
        match self {
            RecordDate::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {ms}")),
            RecordDate::Timestamp {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {seconds}s")),
            RecordDate::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("unparseable date '{s}': {e}")),
        }
    }
}

impl From<DateTime<Utc>> for RecordDate {
    fn from(dt: DateTime<Utc>) -> Self {
        RecordDate::Text(dt.to_rfc3339())
    }
}

/// Transaction document as stored, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<RecordDate>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub is_future_payment: Option<bool>,
    pub due_date: Option<RecordDate>,
    pub detailed_description: Option<String>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = Error;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let label = record
            .id
            .clone()
            .unwrap_or_else(|| "<no id>".to_string());

        let id = record
            .id
            .ok_or_else(|| Error::malformed(&label, "missing id"))?;
        let user_id = record
            .user_id
            .ok_or_else(|| Error::malformed(&label, "missing userId"))?;
        let amount = record
            .amount
            .ok_or_else(|| Error::malformed(&label, "missing amount"))?;
        if !amount_in_range(amount) {
            return Err(Error::malformed(&label, format!("amount out of range: {amount}")));
        }
        let date = record
            .date
            .ok_or_else(|| Error::malformed(&label, "missing date"))?
            .to_utc()
            .map_err(|reason| Error::malformed(&label, reason))?;
        let due_date = record
            .due_date
            .map(|d| d.to_utc())
            .transpose()
            .map_err(|reason| Error::malformed(&label, format!("dueDate: {reason}")))?;

        let status = record.status.unwrap_or(if record.is_future_payment == Some(true) {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Completed
        });

        Ok(Transaction {
            id,
            user_id: UserId::new(user_id),
            description: record.description.unwrap_or_default(),
            amount,
            date,
            category: record.category,
            status,
            due_date,
            detailed_description: record.detailed_description,
        })
    }
}

/// A transaction entered by the user, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub detailed_description: Option<String>,
}

impl NewTransaction {
    pub fn new(description: impl Into<String>, amount: Decimal, date: DateTime<Utc>) -> Result<Self> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(Error::EmptyDescription);
        }
        if !amount_in_range(amount) {
            return Err(Error::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            description,
            amount,
            category: None,
            date,
            due_date: None,
            detailed_description: None,
        })
    }

    /// Set the category; blank input leaves it unset.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into().trim().to_string();
        self.category = (!category.is_empty()).then_some(category);
        self
    }

    pub fn with_detailed_description(mut self, detail: impl Into<String>) -> Self {
        self.detailed_description = Some(detail.into());
        self
    }

    /// Turn this into a pending payment due at `due`. A due day earlier than
    /// today (both seen in `tz`) is rejected.
    pub fn future_payment(mut self, due: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> Result<Self> {
        let due_day = local_date(&due, tz);
        let today = local_date(&now, tz);
        if due_day < today {
            return Err(Error::DueDateInPast {
                due: due_day,
                today,
            });
        }
        self.due_date = Some(due);
        Ok(self)
    }

    pub fn status(&self) -> TransactionStatus {
        if self.due_date.is_some() {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Completed
        }
    }

    /// Document shape to persist under `id`.
    pub fn to_record(&self, id: impl Into<String>, user: &UserId) -> TransactionRecord {
        TransactionRecord {
            id: Some(id.into()),
            user_id: Some(user.as_str().to_string()),
            description: Some(self.description.clone()),
            amount: Some(self.amount),
            date: Some(self.date.into()),
            category: Some(self.category.clone().unwrap_or_default()),
            status: Some(self.status()),
            is_future_payment: Some(self.due_date.is_some()),
            due_date: self.due_date.map(RecordDate::from),
            detailed_description: self.detailed_description.clone(),
        }
    }
}

/// Parse a user-typed amount, accepting either `,` or `.` as the decimal
/// separator ("12,50" and "12.50" are the same).
pub fn parse_amount_input(input: &str) -> Result<Decimal> {
    let normalized = input.trim().replacen(',', ".", 1);
    Decimal::from_str(&normalized)
        .ok()
        .filter(|amount| amount_in_range(*amount))
        .ok_or_else(|| Error::InvalidAmount(input.to_string()))
}
