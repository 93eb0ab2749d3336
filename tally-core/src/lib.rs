//! tally-core: transaction aggregation engine for the Tally finance tracker

pub mod chat_context;
pub mod error;
pub mod filter;
pub mod money;
pub mod payments;
pub mod period;
pub mod settings;
pub mod shopping;
pub mod summary;
pub mod time;
pub mod transaction;

pub use chat_context::{build_chat_context, ChatContext, ChatTurn, Conversation, Role};
pub use error::{Error, Result};
pub use filter::filter_by_period;
pub use money::{render_summary, render_summary_for, Currency, Locale, MoneyFormat};
pub use payments::{overdue_payments, upcoming_payments};
pub use period::{resolve_period, DateRange, Period};
pub use settings::{ChatSettings, KeyValueStore, MemoryKeyValueStore};
pub use shopping::{
    BudgetCheck, ListStatus, ShoppingItem, ShoppingList, MAX_QUANTITY, PURCHASE_CATEGORY,
};
pub use summary::{summarize, summarize_with_fallback, CategoryTotal, Summary, FALLBACK_CATEGORY};
pub use transaction::{
    amount_in_range, parse_amount_input, NewTransaction, RecordDate, Transaction,
    TransactionRecord, TransactionStatus, UserId, MAX_AMOUNT_UNITS,
};
