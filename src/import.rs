// 📥 Import - extracted statement rows (CSV) → users / cards / statements / transactions
//
// The external processor turns a PDF statement into rows:
//   statement_date,date,description,amount,type,category
// Re-importing the same file is a no-op thanks to the idempotency hash.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::filter::TransactionQuery;
use crate::models::{Card, Statement, Transaction, TransactionType, User, UserId};
use crate::period::Period;
use crate::store::sqlite::{
    count_cards, find_card_by_name, find_or_create_statement, insert_card, insert_transactions,
    insert_user,
};

const CARD_COLORS: [&str; 6] = ["#4F46E5", "#059669", "#DC2626", "#D97706", "#7C3AED", "#0891B2"];

/// One extracted row, fields still raw text
#[derive(Debug, Clone, Deserialize)]
pub struct StatementRow {
    pub statement_date: String,
    pub date: String,
    pub description: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub rows: usize,
    pub statements: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

pub fn read_statement_rows<R: Read>(reader: R) -> Result<Vec<StatementRow>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: StatementRow = result.context("Failed to deserialize statement row")?;
        rows.push(row);
    }

    Ok(rows)
}

fn parse_date(raw: &str, line: usize, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("row {}: invalid {} '{}'", line, field, raw))
}

/// Creates the user and card when missing, then inserts every row
pub fn import_rows(
    conn: &Connection,
    user_id: &str,
    card_name: &str,
    rows: &[StatementRow],
) -> Result<ImportReport> {
    let tx = conn.unchecked_transaction()?;

    insert_user(
        &tx,
        &User {
            id: user_id.to_string(),
            email: String::new(),
            name: user_id.to_string(),
        },
    )?;

    let card = match find_card_by_name(&tx, user_id, card_name)? {
        Some(card) => card,
        None => {
            let existing = count_cards(&tx, &TransactionQuery::for_user(&UserId::new(user_id)))?;
            let card = Card {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                name: card_name.to_string(),
                color: CARD_COLORS[existing % CARD_COLORS.len()].to_string(),
            };
            insert_card(&tx, &card)?;
            card
        }
    };

    let mut statements: HashMap<Period, Statement> = HashMap::new();
    let mut transactions = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        // Header is line 1
        let line = index + 2;
        let statement_date = parse_date(&row.statement_date, line, "statement_date")?;
        let date = parse_date(&row.date, line, "date")?;
        let amount: Decimal = row
            .amount
            .parse()
            .with_context(|| format!("row {}: invalid amount '{}'", line, row.amount))?;
        let transaction_type: TransactionType = row
            .transaction_type
            .parse()
            .map_err(|e: String| anyhow::anyhow!("row {}: {}", line, e))?;

        let period = Period::from_date(statement_date);
        let statement = match statements.get(&period) {
            Some(statement) => statement.clone(),
            None => {
                let statement = find_or_create_statement(&tx, &card.id, statement_date)?;
                statements.insert(period, statement.clone());
                statement
            }
        };

        transactions.push(Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            statement_id: statement.id,
            date,
            description: row.description.clone(),
            amount,
            transaction_type,
            category: row.category.clone().filter(|c| !c.trim().is_empty()),
        });
    }

    let summary = insert_transactions(&tx, &transactions)?;
    tx.commit()?;

    let report = ImportReport {
        rows: rows.len(),
        statements: statements.len(),
        inserted: summary.inserted,
        duplicates: summary.duplicates,
    };

    info!(
        user_id,
        card = card_name,
        rows = report.rows,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "Imported statement rows"
    );

    Ok(report)
}

pub fn import_csv(conn: &Connection, csv_path: &Path, user_id: &str, card_name: &str) -> Result<ImportReport> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {:?}", csv_path))?;
    let rows = read_statement_rows(file)?;
    import_rows(conn, user_id, card_name, &rows)
}
