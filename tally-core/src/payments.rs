//! Pending future payments (bills with a due date).

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::time::local_date;
use crate::transaction::Transaction;

/// Pending future payments ordered by due date; ties keep input order.
pub fn upcoming_payments(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut pending: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.is_future_payment())
        .collect();
    pending.sort_by_key(|t| t.due_date);
    pending
}

/// Pending payments whose due day (in `tz`) is before `today`.
pub fn overdue_payments<'a>(
    transactions: &'a [Transaction],
    today: NaiveDate,
    tz: &Tz,
) -> Vec<&'a Transaction> {
    upcoming_payments(transactions)
        .into_iter()
        .filter(|t| t.due_date.is_some_and(|due| local_date(&due, tz) < today))
        .collect()
}
