use anyhow::{bail, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use tally_core::{parse_amount_input, Error as CoreError, MoneyFormat, ShoppingItem, ShoppingList};
use tally_store::{JsonFileStore, ShoppingListStore};

use crate::finance_cmd::Session;

/// Shopping lists always live in the local file store; the finished
/// purchase goes to the configured transaction store.
fn list_store(session: &Session) -> Result<JsonFileStore> {
    Ok(JsonFileStore::new(session.cfg.store_path()?))
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn require_active(store: &JsonFileStore) -> Result<ShoppingList> {
    store
        .active_list()
        .await?
        .context("no active shopping list; start one with: tally shop new <title> --budget <amount>")
}

pub async fn new_list(session: &Session, title: &str, budget: &str) -> Result<()> {
    let store = list_store(session)?;
    if let Some(active) = store.active_list().await? {
        bail!("shopping list '{}' is still active; finish it first", active.title);
    }

    let budget = parse_amount_input(budget)?;
    let list = ShoppingList::new(short_id(), title, budget, session.user.clone(), Utc::now())?;
    store.save_list(&list).await?;
    println!("Started '{}' with budget {}", list.title, session.money.format(list.budget));
    Ok(())
}

pub struct ItemArgs<'a> {
    pub name: &'a str,
    pub price: &'a str,
    pub quantity: &'a str,
    pub unit: Option<&'a str>,
    pub force: bool,
}

pub async fn add_item(session: &Session, args: ItemArgs<'_>) -> Result<()> {
    let store = list_store(session)?;
    let mut list = require_active(&store).await?;

    let item = ShoppingItem::new(
        short_id(),
        args.name,
        parse_amount_input(args.price)?,
        parse_amount_input(args.quantity)?,
        args.unit,
    )?;

    match list.add_item(item, args.force) {
        Ok(check) => {
            store.save_list(&list).await?;
            if check.over_budget {
                tracing::warn!(list = %list.id, "shopping list over budget");
            }
            println!("{}", budget_line(&list, &session.money));
            Ok(())
        }
        Err(CoreError::OverBudget { total, budget }) => bail!(
            "this item brings the total to {} (budget {}); re-run with --force to add it anyway",
            session.money.format(total),
            session.money.format(budget)
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_item(session: &Session, id: &str) -> Result<()> {
    let store = list_store(session)?;
    let mut list = require_active(&store).await?;
    let removed = list.remove_item(id)?;
    store.save_list(&list).await?;
    println!("Removed {}", removed.describe());
    println!("{}", budget_line(&list, &session.money));
    Ok(())
}

pub async fn show(session: &Session) -> Result<()> {
    let store = list_store(session)?;
    let list = require_active(&store).await?;

    println!("{}", list.title);
    if list.items.is_empty() {
        println!("  (empty)");
    }
    for item in &list.items {
        println!(
            "  [{}] {}  {}",
            item.id,
            item.describe(),
            session.money.format(item.line_total())
        );
    }
    println!("{}", budget_line(&list, &session.money));
    Ok(())
}

pub async fn finish(session: &Session) -> Result<()> {
    let store = list_store(session)?;
    let mut list = require_active(&store).await?;

    let purchase = list.finish(Utc::now())?;
    let id = session.store.add_transaction(&session.user, &purchase).await?;
    store.save_list(&list).await?;

    tracing::info!(list = %list.id, transaction = %id, "finished shopping list");
    println!(
        "Recorded '{}' for {} ({})",
        purchase.description,
        session.money.format(purchase.amount),
        purchase.detailed_description.as_deref().unwrap_or("")
    );
    Ok(())
}

/// `Total R$ 50,00 of R$ 100,00 (50%), remaining R$ 50,00`
pub fn budget_line(list: &ShoppingList, money: &MoneyFormat) -> String {
    format!(
        "Total {} of {} ({}%), remaining {}",
        money.format(list.total()),
        money.format(list.budget),
        list.usage_percent(),
        money.format(list.remaining())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_core::{Currency, Locale, UserId};

    #[test]
    fn test_budget_line() {
        let mut list =
            ShoppingList::new("l1", "Feira", dec!(100), UserId::new("u1"), Utc::now()).unwrap();
        list.add_item(
            ShoppingItem::new("a", "Arroz", dec!(25), dec!(2), Some("kg")).unwrap(),
            false,
        )
        .unwrap();

        let money = MoneyFormat::new(Locale::PtBr, Currency::Brl);
        assert_eq!(
            budget_line(&list, &money),
            "Total R$\u{a0}50,00 of R$\u{a0}100,00 (50%), remaining R$\u{a0}50,00"
        );
    }

    #[test]
    fn test_short_id_len() {
        assert_eq!(short_id().len(), 8);
    }
}
