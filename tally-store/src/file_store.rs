//! Local JSON document store: one file holding every collection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use tally_core::{NewTransaction, ShoppingList, TransactionRecord, UserId};

use crate::error::{Result, StoreError};
use crate::{ShoppingListStore, TransactionStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
    #[serde(default)]
    shopping_lists: Vec<ShoppingList>,
}

/// Store backed by a single JSON file. A missing file is an empty store.
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Document> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(Document::default()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    async fn write(&self, doc: &Document) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for JsonFileStore {
    async fn fetch_transactions(&self, user: &UserId) -> Result<Vec<TransactionRecord>> {
        let doc = self.read().await?;
        Ok(doc
            .transactions
            .into_iter()
            .filter(|r| r.user_id.as_deref() == Some(user.as_str()))
            .collect())
    }

    async fn add_transaction(&self, user: &UserId, tx: &NewTransaction) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;

        let id = Uuid::new_v4().to_string();
        doc.transactions.push(tx.to_record(id.clone(), user));
        self.write(&doc).await?;

        tracing::debug!(path = %self.path.display(), id = %id, "stored transaction");
        Ok(id)
    }

    async fn add_transactions(&self, user: &UserId, txs: &[NewTransaction]) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;

        let ids: Vec<String> = txs.iter().map(|_| Uuid::new_v4().to_string()).collect();
        doc.transactions
            .extend(txs.iter().zip(&ids).map(|(tx, id)| tx.to_record(id.clone(), user)));
        self.write(&doc).await?;

        tracing::debug!(path = %self.path.display(), count = ids.len(), "stored transactions");
        Ok(ids)
    }
}

#[async_trait]
impl ShoppingListStore for JsonFileStore {
    async fn active_list(&self) -> Result<Option<ShoppingList>> {
        let doc = self.read().await?;
        Ok(doc.shopping_lists.into_iter().find(|l| l.is_active()))
    }

    async fn save_list(&self, list: &ShoppingList) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;

        match doc.shopping_lists.iter_mut().find(|l| l.id == list.id) {
            Some(existing) => *existing = list.clone(),
            None => doc.shopping_lists.push(list.clone()),
        }
        self.write(&doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_transactions;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tally_core::{ShoppingItem, TransactionStatus};

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data").join("tally.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        let user = UserId::new("u1");
        assert!(store.fetch_transactions(&user).await.unwrap().is_empty());
        assert!(store.active_list().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_and_fetch_per_user() {
        let (_dir, store) = store();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let date = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();

        let salary = NewTransaction::new("Salário", dec!(4200), date).unwrap();
        let coffee = NewTransaction::new("Café", dec!(-7.5), date)
            .unwrap()
            .with_category("Food");

        let id = store.add_transaction(&alice, &salary).await.unwrap();
        store.add_transaction(&bob, &coffee).await.unwrap();

        let alices = load_transactions(&store, &alice).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].id, id);
        assert_eq!(alices[0].amount, dec!(4200));
        assert_eq!(alices[0].status, TransactionStatus::Completed);

        let bobs = load_transactions(&store, &bob).await.unwrap();
        assert_eq!(bobs[0].category.as_deref(), Some("Food"));
    }

    #[tokio::test]
    async fn test_batch_add_in_one_write() {
        let (_dir, store) = store();
        let user = UserId::new("u1");
        let date = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let rows = vec![
            NewTransaction::new("Aluguel", dec!(-1500), date).unwrap(),
            NewTransaction::new("Salário", dec!(4200), date).unwrap(),
        ];

        let ids = store.add_transactions(&user, &rows).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let stored = load_transactions(&store, &user).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, ids[0]);
        assert_eq!(stored[1].amount, dec!(4200));
    }

    #[tokio::test]
    async fn test_batch_add_leaves_unreadable_file_untouched() {
        let (dir, _) = store();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        let date = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let rows = vec![NewTransaction::new("Café", dec!(-7.5), date).unwrap()];
        let err = store.add_transactions(&UserId::new("u1"), &rows).await.unwrap_err();

        assert!(matches!(err, StoreError::Json(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_malformed_record_fails_load() {
        let (dir, _) = store();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{ "transactions": [ { "id": "x", "userId": "u1", "date": "2026-01-01T00:00:00Z" } ] }"#,
        )
        .unwrap();
        let store = JsonFileStore::new(&path);

        let err = load_transactions(&store, &UserId::new("u1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(tally_core::Error::MalformedTransaction { .. })
        ));
    }

    #[tokio::test]
    async fn test_shopping_list_save_replaces_by_id() {
        let (_dir, store) = store();
        let created = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let mut list =
            ShoppingList::new("l1", "Feira", dec!(80), UserId::new("alice"), created).unwrap();
        store.save_list(&list).await.unwrap();

        list.add_item(
            ShoppingItem::new("i1", "Banana", dec!(6), dec!(1), Some("kg")).unwrap(),
            false,
        )
        .unwrap();
        store.save_list(&list).await.unwrap();

        let active = store.active_list().await.unwrap().unwrap();
        assert_eq!(active.items.len(), 1);

        list.finish(created).unwrap();
        store.save_list(&list).await.unwrap();
        assert!(store.active_list().await.unwrap().is_none());
    }
}
