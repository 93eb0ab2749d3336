//! Client-side date filtering of a user's transactions.

use crate::period::DateRange;
use crate::transaction::Transaction;

/// Keep the transactions dated within `range` (both ends inclusive),
/// in their original order.
pub fn filter_by_period(transactions: &[Transaction], range: &DateRange) -> Vec<Transaction> {
    let kept: Vec<Transaction> = transactions
        .iter()
        .filter(|t| range.contains(&t.date))
        .cloned()
        .collect();

    tracing::trace!(
        total = transactions.len(),
        kept = kept.len(),
        start = %range.start,
        end = %range.end,
        "filtered transactions by period"
    );
    kept
}
