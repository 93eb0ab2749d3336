//! Reduce a set of transactions into income/expense totals and a
//! per-category expense breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Bucket for expenses without a category.
pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_balance: Decimal,
    /// Expense totals in order of each category's first appearance
    pub category_totals: Vec<CategoryTotal>,
}

impl Summary {
    pub fn category_total(&self, category: &str) -> Option<Decimal> {
        self.category_totals
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.amount)
    }

    pub fn is_empty(&self) -> bool {
        self.total_income.is_zero() && self.total_expenses.is_zero() && self.category_totals.is_empty()
    }
}

/// Summarize with [`FALLBACK_CATEGORY`] for uncategorized expenses.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    summarize_with_fallback(transactions, FALLBACK_CATEGORY)
}

/// Single pass: positive amounts are income; everything else (zero
/// included) is an expense of `abs(amount)` attributed to its category.
pub fn summarize_with_fallback(transactions: &[Transaction], fallback: &str) -> Summary {
    let mut summary = Summary::default();

    for t in transactions {
        if t.is_income() {
            summary.total_income += t.amount;
            continue;
        }

        let amount = t.expense_amount();
        summary.total_expenses += amount;

        let label = t.category_label(fallback);
        match summary
            .category_totals
            .iter_mut()
            .find(|c| c.category == label)
        {
            Some(entry) => entry.amount += amount,
            None => summary.category_totals.push(CategoryTotal {
                category: label.to_string(),
                amount,
            }),
        }
    }

    summary.net_balance = summary.total_income - summary.total_expenses;
    summary
}
