use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::path::Path;

use tally_core::time::{local_date, parse_local_datetime};
use tally_core::{
    build_chat_context, filter_by_period, overdue_payments, parse_amount_input, render_summary,
    summarize_with_fallback, upcoming_payments, ChatContext, ChatSettings, Conversation,
    MoneyFormat, NewTransaction, Period, Transaction, UserId,
};
use tally_store::{import_csv, load_transactions, FirestoreStore, JsonFileStore, TransactionStore};

use crate::chat;
use crate::config::{Backend, Config};
use crate::llm::GeminiClient;
use crate::settings_file::SettingsFile;
use crate::state::settings_path;

/// Everything a command needs, resolved once from config and flags.
pub struct Session {
    pub cfg: Config,
    pub user: UserId,
    pub money: MoneyFormat,
    pub tz: Tz,
    pub store: Box<dyn TransactionStore>,
}

impl Session {
    pub fn open(cfg: Config, cli_user: Option<&str>) -> Result<Self> {
        let user = cfg.user_id(cli_user);
        let money = cfg.money_format()?;
        let tz = cfg.timezone()?;
        let store = open_store(&cfg)?;
        Ok(Self {
            cfg,
            user,
            money,
            tz,
            store,
        })
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        load_transactions(self.store.as_ref(), &self.user)
            .await
            .with_context(|| format!("load transactions for {}", self.user))
    }

    pub fn chat_settings(&self) -> Result<ChatSettings> {
        let file = SettingsFile::open(settings_path()?)?;
        Ok(ChatSettings::load(&file)?)
    }

    async fn chat_context(&self, period: Option<Period>) -> Result<(ChatContext, ChatSettings)> {
        let txs = self.transactions().await?;
        let settings = self.chat_settings()?;
        let range = period.map(|p| p.resolve_now(&self.tz));
        let ctx = build_chat_context(&txs, range.as_ref(), &self.money, &settings);
        Ok((ctx, settings))
    }
}

fn open_store(cfg: &Config) -> Result<Box<dyn TransactionStore>> {
    match cfg.store.backend {
        Backend::File => {
            let path = cfg.store_path()?;
            tracing::debug!(path = %path.display(), "using file store");
            Ok(Box::new(JsonFileStore::new(path)))
        }
        Backend::Firestore => {
            let Some(project) = cfg.store.project_id.as_deref() else {
                bail!("[store] backend = \"firestore\" needs project_id in config.toml");
            };
            let token = std::env::var(&cfg.store.id_token_env).ok();
            if token.is_none() {
                tracing::warn!(var = %cfg.store.id_token_env, "no Firebase ID token in environment");
            }
            Ok(Box::new(FirestoreStore::new(project, token)))
        }
    }
}

pub async fn summary(session: &Session, period: Option<Period>, json: bool) -> Result<()> {
    let txs = session.transactions().await?;
    let selected = match period {
        Some(p) => {
            let range = p.resolve_now(&session.tz);
            tracing::debug!(period = %p, start = %range.start, end = %range.end, "resolved period");
            filter_by_period(&txs, &range)
        }
        None => txs,
    };

    let summary = summarize_with_fallback(&selected, session.money.locale().fallback_category());
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary(&summary, &session.money));
    }
    Ok(())
}

pub async fn list(session: &Session, period: Option<Period>) -> Result<()> {
    let txs = session.transactions().await?;
    let selected = match period {
        Some(p) => filter_by_period(&txs, &p.resolve_now(&session.tz)),
        None => txs,
    };

    if selected.is_empty() {
        println!("(no transactions)");
        return Ok(());
    }
    let fallback = session.money.locale().fallback_category();
    for t in &selected {
        println!("{}", format_row(t, &session.money, &session.tz, fallback));
    }
    Ok(())
}

/// `2026-02-18 09:00  -R$ 12,50  Food  Padaria`
pub fn format_row(t: &Transaction, money: &MoneyFormat, tz: &Tz, fallback: &str) -> String {
    let mut row = format!(
        "{}  {:>14}  {}  {}",
        t.date.with_timezone(tz).format("%Y-%m-%d %H:%M"),
        money.format(t.amount),
        t.category_label(fallback),
        t.description
    );
    if let Some(due) = t.due_date.filter(|_| t.is_future_payment()) {
        row.push_str(&format!("  (due {})", local_date(&due, tz)));
    }
    row
}

pub struct AddArgs<'a> {
    pub description: &'a str,
    pub amount: &'a str,
    pub category: Option<&'a str>,
    pub date: Option<&'a str>,
    pub due: Option<&'a str>,
}

pub fn build_new_transaction(args: &AddArgs<'_>, now: DateTime<Utc>, tz: &Tz) -> Result<NewTransaction> {
    let amount = parse_amount_input(args.amount)?;
    let date = match args.date {
        Some(d) => parse_local_datetime(d, tz)?,
        None => now,
    };

    let mut tx = NewTransaction::new(args.description, amount, date)?;
    if let Some(c) = args.category {
        tx = tx.with_category(c);
    }
    if let Some(due) = args.due {
        tx = tx.future_payment(parse_local_datetime(due, tz)?, now, tz)?;
    }
    Ok(tx)
}

pub async fn add(session: &Session, args: AddArgs<'_>) -> Result<()> {
    let tx = build_new_transaction(&args, Utc::now(), &session.tz)?;
    let id = session.store.add_transaction(&session.user, &tx).await?;
    tracing::info!(id = %id, user = %session.user, "added transaction");
    println!("Added {} ({}) id={}", tx.description, session.money.format(tx.amount), id);
    Ok(())
}

pub async fn upcoming(session: &Session) -> Result<()> {
    let txs = session.transactions().await?;
    let today = local_date(&Utc::now(), &session.tz);
    let lines = upcoming_lines(&txs, &session.money, &session.tz, today);
    if lines.is_empty() {
        println!("(no upcoming payments)");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// `2026-08-05  -R$ 100,00  Conta de luz  OVERDUE`, by due date.
pub fn upcoming_lines(txs: &[Transaction], money: &MoneyFormat, tz: &Tz, today: NaiveDate) -> Vec<String> {
    let overdue: HashSet<&str> = overdue_payments(txs, today, tz)
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();

    upcoming_payments(txs)
        .into_iter()
        .filter_map(|t| {
            let due = local_date(&t.due_date?, tz);
            let flag = if overdue.contains(t.id.as_str()) { "  OVERDUE" } else { "" };
            Some(format!("{}  {:>14}  {}{}", due, money.format(t.amount), t.description, flag))
        })
        .collect()
}

pub async fn import(session: &Session, csv: &Path) -> Result<()> {
    if !csv.exists() {
        bail!("CSV not found: {}", csv.display());
    }
    let rows = import_csv(csv, &session.tz).with_context(|| format!("parsing {}", csv.display()))?;

    let count = import_rows(session.store.as_ref(), &session.user, &rows).await?;
    println!("Imported {} transactions from {}", count, csv.display());
    Ok(())
}

/// Store all rows in a single batch; if the store rejects it nothing is
/// recorded.
pub async fn import_rows(store: &dyn TransactionStore, user: &UserId, rows: &[NewTransaction]) -> Result<usize> {
    let ids = store
        .add_transactions(user, rows)
        .await
        .with_context(|| format!("storing {} imported rows (none were saved)", rows.len()))?;
    tracing::info!(user = %user, count = ids.len(), "imported transactions");
    Ok(ids.len())
}

pub async fn ask(session: &Session, message: &str, period: Option<Period>) -> Result<()> {
    let (ctx, settings) = session.chat_context(period).await?;
    let client = GeminiClient::new(&session.cfg.llm, settings.api_key.as_deref())?;

    let reply = client
        .generate(&ctx.system_instruction(), &[], message)
        .await
        .context("ask")?;
    println!("{reply}");
    Ok(())
}

pub async fn chat(session: &Session, period: Option<Period>) -> Result<()> {
    let (ctx, settings) = session.chat_context(period).await?;
    let client = GeminiClient::new(&session.cfg.llm, settings.api_key.as_deref())?;
    let conversation = Conversation::new(session.money.locale());

    chat::run_chat(&client, &ctx, conversation, session.cfg.chat.max_turns_context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use tally_core::{Currency, Locale, TransactionRecord, TransactionStatus};
    use tally_store::StoreError;

    /// Accepts single writes, refuses batches, and remembers what it stored.
    #[derive(Default)]
    struct RejectingStore {
        stored: Mutex<Vec<TransactionRecord>>,
    }

    #[async_trait]
    impl TransactionStore for RejectingStore {
        async fn fetch_transactions(&self, _user: &UserId) -> tally_store::Result<Vec<TransactionRecord>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn add_transaction(&self, user: &UserId, tx: &NewTransaction) -> tally_store::Result<String> {
            let mut stored = self.stored.lock().unwrap();
            let id = format!("t{}", stored.len());
            stored.push(tx.to_record(id.clone(), user));
            Ok(id)
        }

        async fn add_transactions(&self, _user: &UserId, txs: &[NewTransaction]) -> tally_store::Result<Vec<String>> {
            Err(StoreError::Http {
                status: 503,
                body: format!("commit of {} writes aborted", txs.len()),
            })
        }
    }

    fn sp() -> Tz {
        chrono_tz::America::Sao_Paulo
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_build_with_local_date_and_category() {
        let args = AddArgs {
            description: "Padaria",
            amount: "-12,50",
            category: Some("Alimentação"),
            date: Some("2026-10-18 08:30"),
            due: None,
        };
        let tx = build_new_transaction(&args, now(), &sp()).unwrap();
        assert_eq!(tx.amount, dec!(-12.50));
        assert_eq!(tx.date, Utc.with_ymd_and_hms(2026, 10, 18, 11, 30, 0).unwrap());
        assert_eq!(tx.category.as_deref(), Some("Alimentação"));
        assert_eq!(tx.status(), TransactionStatus::Completed);
    }

    #[test]
    fn test_build_future_payment() {
        let args = AddArgs {
            description: "Conta de luz",
            amount: "-180",
            category: None,
            date: None,
            due: Some("2026-10-25"),
        };
        let tx = build_new_transaction(&args, now(), &sp()).unwrap();
        assert_eq!(tx.date, now());
        assert_eq!(tx.status(), TransactionStatus::Pending);

        let past = AddArgs {
            due: Some("2026-10-01"),
            ..args
        };
        assert!(build_new_transaction(&past, now(), &sp()).is_err());
    }

    #[test]
    fn test_build_rejects_bad_amount() {
        let args = AddArgs {
            description: "Uber",
            amount: "vinte",
            category: None,
            date: None,
            due: None,
        };
        assert!(build_new_transaction(&args, now(), &sp()).is_err());
    }

    #[tokio::test]
    async fn test_failed_import_stores_nothing() {
        let store = RejectingStore::default();
        let user = UserId::new("u1");
        let rows = vec![
            NewTransaction::new("Aluguel", dec!(-1500), now()).unwrap(),
            NewTransaction::new("Salário", dec!(4200), now()).unwrap(),
        ];

        let err = import_rows(&store, &user, &rows).await.unwrap_err();
        assert!(err.to_string().contains("none were saved"));
        assert!(store.fetch_transactions(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_rows_into_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tally.json"));
        let user = UserId::new("u1");
        let rows = vec![
            NewTransaction::new("Aluguel", dec!(-1500), now()).unwrap(),
            NewTransaction::new("Salário", dec!(4200), now()).unwrap(),
        ];

        assert_eq!(import_rows(&store, &user, &rows).await.unwrap(), 2);
        assert_eq!(load_transactions(&store, &user).await.unwrap().len(), 2);
    }

    #[test]
    fn test_upcoming_lines_flag_overdue() {
        let money = MoneyFormat::new(Locale::PtBr, Currency::Brl);
        let bill = |id: &str, day: u32| {
            Transaction::new(id, UserId::new("u1"), id, dec!(-100), now())
                .with_due_date(Utc.with_ymd_and_hms(2026, 10, day, 15, 0, 0).unwrap())
        };
        let paid = Transaction::new("paid", UserId::new("u1"), "paid", dec!(-5), now());
        let txs = vec![bill("agua", 25), paid, bill("luz", 5)];
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let lines = upcoming_lines(&txs, &money, &sp(), today);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2026-10-05"));
        assert!(lines[0].ends_with("luz  OVERDUE"));
        assert!(lines[1].ends_with("agua"));
    }

    #[test]
    fn test_format_row() {
        let money = MoneyFormat::new(Locale::PtBr, Currency::Brl);
        let t = Transaction::new(
            "t1",
            UserId::new("u1"),
            "Padaria",
            dec!(-12.5),
            Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap(),
        );
        let row = format_row(&t, &money, &sp(), "Outros");
        assert!(row.starts_with("2026-02-18 09:00"));
        assert!(row.contains("-R$\u{a0}12,50"));
        assert!(row.ends_with("Outros  Padaria"));
    }
}
