//! Import transactions from a CSV export.
//!
//! Expected header: `date,description,amount[,category]`. Dates are local
//! (`2026-02-20` or `2026-02-20 18:30`) in the configured timezone; amounts
//! accept either decimal separator. Unlike a bank statement scrape, a bad
//! row aborts the import so nothing is half-loaded.

use chrono_tz::Tz;
use std::io::Read;
use std::path::Path;

use tally_core::time::parse_local_datetime;
use tally_core::{parse_amount_input, NewTransaction};

use crate::error::{Result, StoreError};

const REQUIRED: [&str; 3] = ["date", "description", "amount"];

pub fn import_csv(path: impl AsRef<Path>, tz: &Tz) -> Result<Vec<NewTransaction>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
    let txs = parse_csv(file, tz)?;
    tracing::info!(path = %path.display(), rows = txs.len(), "parsed csv import");
    Ok(txs)
}

pub fn parse_csv<R: Read>(reader: R, tz: &Tz) -> Result<Vec<NewTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };

    let mut idx = [0usize; 3];
    for (slot, name) in idx.iter_mut().zip(REQUIRED) {
        *slot = column(name).ok_or_else(|| StoreError::Import {
            line: 1,
            reason: format!("missing column '{name}'"),
        })?;
    }
    let [date_col, desc_col, amount_col] = idx;
    let category_col = column("category");

    let mut txs = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
        let fail = |reason: String| StoreError::Import { line, reason };

        let field = |col: usize| record.get(col).unwrap_or("");

        let date = parse_local_datetime(field(date_col), tz).map_err(|e| fail(e.to_string()))?;
        let amount = parse_amount_input(field(amount_col)).map_err(|e| fail(e.to_string()))?;
        let mut tx =
            NewTransaction::new(field(desc_col), amount, date).map_err(|e| fail(e.to_string()))?;
        if let Some(col) = category_col {
            tx = tx.with_category(field(col));
        }

        txs.push(tx);
    }

    Ok(txs)
}
