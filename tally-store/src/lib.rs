//! tally-store: durable state behind the engine. Stores for transactions
//! and shopping lists, plus CSV import.

pub mod csv_import;
pub mod error;
pub mod file_store;
pub mod firestore;

pub use csv_import::{import_csv, parse_csv};
pub use error::{Result, StoreError};
pub use file_store::JsonFileStore;
pub use firestore::FirestoreStore;

use async_trait::async_trait;
use tally_core::{NewTransaction, ShoppingList, Transaction, TransactionRecord, UserId};

/// Source of a user's transactions. Filtering happens server-side only by
/// owning user; date ranges are applied by the engine.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn fetch_transactions(&self, user: &UserId) -> Result<Vec<TransactionRecord>>;

    /// Persist a new transaction and return its id.
    async fn add_transaction(&self, user: &UserId, tx: &NewTransaction) -> Result<String>;

    /// Persist every transaction or none of them. Ids come back in input
    /// order.
    async fn add_transactions(&self, user: &UserId, txs: &[NewTransaction]) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ShoppingListStore: Send + Sync {
    /// The shared list currently being filled, if any.
    async fn active_list(&self) -> Result<Option<ShoppingList>>;

    /// Insert or replace by id.
    async fn save_list(&self, list: &ShoppingList) -> Result<()>;
}

/// Fetch and validate; one malformed record fails the call.
pub async fn load_transactions(
    store: &dyn TransactionStore,
    user: &UserId,
) -> Result<Vec<Transaction>> {
    let records = store.fetch_transactions(user).await?;
    tracing::debug!(user = %user, records = records.len(), "fetched transaction records");
    Ok(Transaction::from_records(records)?)
}
