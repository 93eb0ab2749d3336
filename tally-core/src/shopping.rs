//! Shared shopping list with a budget. Finishing the list turns it into a
//! single expense transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transaction::{amount_in_range, NewTransaction, UserId};

/// Category given to the expense recorded when a list is finished.
pub const PURCHASE_CATEGORY: &str = "Compras";

/// Largest quantity of one item on a list.
pub const MAX_QUANTITY: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    /// Unit price
    pub price: Decimal,
    pub quantity: Decimal,
    /// "un", "kg", "l", ...
    pub unit: String,
}

impl ShoppingItem {
    pub const DEFAULT_UNIT: &'static str = "un";

    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        quantity: Decimal,
        unit: Option<&str>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidItem("name must not be empty".to_string()));
        }
        if price < Decimal::ZERO || !amount_in_range(price) {
            return Err(Error::InvalidItem(format!("price out of range: {price}")));
        }
        if quantity <= Decimal::ZERO || quantity > Decimal::from(MAX_QUANTITY) {
            return Err(Error::InvalidItem(format!("quantity out of range: {quantity}")));
        }
        let unit = match unit.map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => Self::DEFAULT_UNIT.to_string(),
        };

        Ok(Self {
            id: id.into(),
            name,
            price,
            quantity,
            unit,
        })
    }

    pub fn line_total(&self) -> Decimal {
        self.price * self.quantity
    }

    /// "2kg Arroz"
    pub fn describe(&self) -> String {
        format!("{}{} {}", self.quantity.normalize(), self.unit, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    Active,
    Completed,
}

/// Outcome of checking a list total against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetCheck {
    pub new_total: Decimal,
    pub budget: Decimal,
    pub over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub title: String,
    pub budget: Decimal,
    pub items: Vec<ShoppingItem>,
    pub status: ListStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        budget: Decimal,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidList("title must not be empty".to_string()));
        }
        if budget <= Decimal::ZERO || !amount_in_range(budget) {
            return Err(Error::InvalidList(format!("budget out of range: {budget}")));
        }

        Ok(Self {
            id: id.into(),
            title,
            budget,
            items: Vec::new(),
            status: ListStatus::Active,
            created_by,
            created_at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ListStatus::Active
    }

    /// Always recomputed from the items.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(ShoppingItem::line_total).sum()
    }

    pub fn remaining(&self) -> Decimal {
        self.budget - self.total()
    }

    pub fn is_over_budget(&self) -> bool {
        self.total() > self.budget
    }

    /// Share of the budget used, in whole percent. Not capped at 100.
    pub fn usage_percent(&self) -> Decimal {
        (self.total() * Decimal::ONE_HUNDRED)
            .checked_div(self.budget)
            .unwrap_or(Decimal::ZERO)
            .round_dp(0)
    }

    pub fn preview_add(&self, item: &ShoppingItem) -> BudgetCheck {
        let new_total = self.total() + item.line_total();
        BudgetCheck {
            new_total,
            budget: self.budget,
            over_budget: new_total > self.budget,
        }
    }

    /// Append `item`. Going over budget needs `allow_over_budget`; otherwise
    /// the list is left untouched and `OverBudget` is returned.
    pub fn add_item(&mut self, item: ShoppingItem, allow_over_budget: bool) -> Result<BudgetCheck> {
        if !self.is_active() {
            return Err(Error::ListNotActive);
        }
        if self.items.iter().any(|i| i.id == item.id) {
            return Err(Error::InvalidItem(format!("duplicate item id: {}", item.id)));
        }

        let check = self.preview_add(&item);
        if check.over_budget && !allow_over_budget {
            return Err(Error::OverBudget {
                total: check.new_total,
                budget: self.budget,
            });
        }

        self.items.push(item);
        Ok(check)
    }

    pub fn remove_item(&mut self, id: &str) -> Result<ShoppingItem> {
        if !self.is_active() {
            return Err(Error::ListNotActive);
        }
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        Ok(self.items.remove(pos))
    }

    /// Close the list and return the purchase to record.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<NewTransaction> {
        if !self.is_active() {
            return Err(Error::ListNotActive);
        }

        let detail = self
            .items
            .iter()
            .map(ShoppingItem::describe)
            .collect::<Vec<_>>()
            .join(", ");

        let purchase = NewTransaction::new(self.title.clone(), -self.total(), now)?
            .with_category(PURCHASE_CATEGORY)
            .with_detailed_description(detail);

        self.status = ListStatus::Completed;
        Ok(purchase)
    }
}
