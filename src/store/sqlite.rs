// 🗄️ SQLite store - users → cards → statements → transactions
//
// Synchronous functions take a `&Connection` (used by import and tests).
// `SqliteStore` wraps one connection behind `Arc<Mutex<_>>` and runs every
// query on the blocking pool so the async engine never blocks a worker.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use super::TransactionStore;
use crate::filter::TransactionQuery;
use crate::models::{
    Card, Statement, Transaction, TransactionRecord, TransactionType, User, UserId, UNCATEGORIZED,
};

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS statements (
            id TEXT PRIMARY KEY,
            card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            statement_date TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (card_id, year, month)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            statement_id TEXT NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
            idempotency_hash TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            transaction_type TEXT NOT NULL CHECK (transaction_type IN ('CREDIT', 'DEBIT')),
            category TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cards_user ON cards(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_statements_card ON statements(card_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_statement ON transactions(statement_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// WRITES (import path)
// ============================================================================

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, email, name) VALUES (?1, ?2, ?3)",
        params![user.id, user.email, user.name],
    )?;
    Ok(())
}

pub fn insert_card(conn: &Connection, card: &Card) -> Result<()> {
    conn.execute(
        "INSERT INTO cards (id, user_id, name, color) VALUES (?1, ?2, ?3, ?4)",
        params![card.id, card.user_id, card.name, card.color],
    )
    .with_context(|| format!("Failed to insert card '{}'", card.name))?;
    Ok(())
}

pub fn find_card_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Card>> {
    let card = conn
        .query_row(
            "SELECT id, user_id, name, color FROM cards WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            |row| {
                Ok(Card {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    color: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(card)
}

/// Statements are unique per card and billing month
pub fn find_or_create_statement(
    conn: &Connection,
    card_id: &str,
    statement_date: NaiveDate,
) -> Result<Statement> {
    let year = statement_date.year();
    let month = statement_date.month();

    let existing = conn
        .query_row(
            "SELECT id, card_id, statement_date, year, month
             FROM statements
             WHERE card_id = ?1 AND year = ?2 AND month = ?3",
            params![card_id, year, month],
            |row| {
                Ok(Statement {
                    id: row.get(0)?,
                    card_id: row.get(1)?,
                    statement_date: row.get(2)?,
                    year: row.get(3)?,
                    month: row.get(4)?,
                })
            },
        )
        .optional()?;

    if let Some(statement) = existing {
        return Ok(statement);
    }

    let statement = Statement {
        id: uuid::Uuid::new_v4().to_string(),
        card_id: card_id.to_string(),
        statement_date,
        year,
        month,
    };

    conn.execute(
        "INSERT INTO statements (id, card_id, statement_date, year, month)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            statement.id,
            statement.card_id,
            statement.statement_date,
            statement.year,
            statement.month
        ],
    )?;

    Ok(statement)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Insert transactions, skipping rows whose idempotency hash already exists.
/// Identical rows within the batch are numbered so each one is kept.
pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> Result<InsertSummary> {
    let mut summary = InsertSummary::default();
    let mut occurrences: HashMap<String, usize> = HashMap::new();

    for tx in transactions {
        let occurrence = occurrences.entry(tx.content_key()).or_insert(0);
        let hash = tx.compute_idempotency_hash(*occurrence);
        *occurrence += 1;

        let result = conn.execute(
            "INSERT INTO transactions (
                id, statement_id, idempotency_hash, date, description,
                amount, transaction_type, category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.id,
                tx.statement_id,
                hash,
                tx.date,
                tx.description,
                tx.amount.to_string(),
                tx.transaction_type.as_str(),
                tx.category,
            ],
        );

        match result {
            Ok(_) => summary.inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                summary.duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "Inserted transactions"
    );

    Ok(summary)
}

// ============================================================================
// READS
// ============================================================================

/// `AND <date_column> BETWEEN from AND to`, each bound optional
fn push_date_range(
    query: &TransactionQuery,
    date_column: &str,
    sql: &mut String,
    values: &mut Vec<Value>,
) {
    if let Some(from) = query.from {
        values.push(Value::Text(from.format("%Y-%m-%d").to_string()));
        sql.push_str(&format!(" AND {} >= ?{}", date_column, values.len()));
    }

    if let Some(to) = query.to {
        values.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        sql.push_str(&format!(" AND {} <= ?{}", date_column, values.len()));
    }
}

/// `AND c.id IN (...)` when the query selects cards
fn push_card_selection(query: &TransactionQuery, sql: &mut String, values: &mut Vec<Value>) {
    if query.card_ids.is_empty() {
        return;
    }

    let mut placeholders = Vec::with_capacity(query.card_ids.len());
    for card_id in &query.card_ids {
        values.push(Value::Text(card_id.clone()));
        placeholders.push(format!("?{}", values.len()));
    }
    sql.push_str(&format!(" AND c.id IN ({})", placeholders.join(", ")));
}

/// Category match on the trimmed label. The sentinel also covers NULL and blank.
fn push_category(query: &TransactionQuery, sql: &mut String, values: &mut Vec<Value>) {
    let Some(category) = query.category.as_deref() else {
        return;
    };

    values.push(Value::Text(category.to_string()));
    if category == UNCATEGORIZED {
        sql.push_str(&format!(
            " AND (t.category IS NULL OR TRIM(t.category) IN ('', ?{}))",
            values.len()
        ));
    } else {
        sql.push_str(&format!(" AND TRIM(t.category) = ?{}", values.len()));
    }
}

fn conversion_error(
    index: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err.into())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let amount: String = row.get(7)?;
    let transaction_type: String = row.get(8)?;

    Ok(TransactionRecord {
        id: row.get(0)?,
        statement_id: row.get(1)?,
        card_id: row.get(2)?,
        card_name: row.get(3)?,
        card_color: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        amount: amount
            .parse::<Decimal>()
            .map_err(|e| conversion_error(7, e))?,
        transaction_type: transaction_type
            .parse::<TransactionType>()
            .map_err(|e| conversion_error(8, e))?,
        category: row.get(9)?,
        statement_year: row.get(10)?,
        statement_month: row.get(11)?,
    })
}

pub fn get_transactions(conn: &Connection, query: &TransactionQuery) -> Result<Vec<TransactionRecord>> {
    let mut sql = String::from(
        "SELECT t.id, t.statement_id, c.id, c.name, c.color, t.date, t.description,
                t.amount, t.transaction_type, t.category, s.year, s.month
         FROM transactions t
         JOIN statements s ON s.id = t.statement_id
         JOIN cards c ON c.id = s.card_id
         WHERE c.user_id = ?1",
    );
    let mut values = vec![Value::Text(query.user_id.as_str().to_string())];
    push_date_range(query, "t.date", &mut sql, &mut values);
    push_card_selection(query, &mut sql, &mut values);
    push_category(query, &mut sql, &mut values);
    sql.push_str(" ORDER BY t.date, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params_from_iter(values.iter()), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_cards(conn: &Connection, query: &TransactionQuery) -> Result<usize> {
    let mut sql = String::from("SELECT COUNT(*) FROM cards c WHERE c.user_id = ?1");
    let mut values = vec![Value::Text(query.user_id.as_str().to_string())];

    // Date range and category do not narrow cards
    push_card_selection(query, &mut sql, &mut values);

    let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count as usize)
}

pub fn count_statements(conn: &Connection, query: &TransactionQuery) -> Result<usize> {
    let mut sql = String::from(
        "SELECT COUNT(*)
         FROM statements s
         JOIN cards c ON c.id = s.card_id
         WHERE c.user_id = ?1",
    );
    let mut values = vec![Value::Text(query.user_id.as_str().to_string())];
    push_date_range(query, "s.statement_date", &mut sql, &mut values);
    push_card_selection(query, &mut sql, &mut values);

    let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count as usize)
}

pub fn get_distinct_categories(conn: &Connection, user_id: &str) -> Result<Vec<Option<String>>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.category
         FROM transactions t
         JOIN statements s ON s.id = t.statement_id
         JOIN cards c ON c.id = s.card_id
         WHERE c.user_id = ?1
         ORDER BY t.category",
    )?;

    let categories = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<Result<Vec<Option<String>>, _>>()?;

    Ok(categories)
}

pub fn user_exists(conn: &Connection, user_id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

// ============================================================================
// ASYNC STORE
// ============================================================================

/// Shared connection
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("database connection lock poisoned"))?;
            f(&guard)
        })
        .await
        .context("database task failed")?
    }
}

#[async_trait]
impl TransactionStore for SqliteStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        let user_id = user_id.as_str().to_string();
        self.with_conn(move |conn| user_exists(conn, &user_id)).await
    }

    #[instrument(skip(self, query), fields(user_id = %query.user_id))]
    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>> {
        let query = query.clone();
        let records = self
            .with_conn(move |conn| get_transactions(conn, &query))
            .await
            .context("Failed to fetch transactions")?;
        debug!(rows = records.len(), "Fetched transactions");
        Ok(records)
    }

    #[instrument(skip(self, query), fields(user_id = %query.user_id))]
    async fn count_cards(&self, query: &TransactionQuery) -> Result<usize> {
        let query = query.clone();
        self.with_conn(move |conn| count_cards(conn, &query))
            .await
            .context("Failed to count cards")
    }

    #[instrument(skip(self, query), fields(user_id = %query.user_id))]
    async fn count_statements(&self, query: &TransactionQuery) -> Result<usize> {
        let query = query.clone();
        self.with_conn(move |conn| count_statements(conn, &query))
            .await
            .context("Failed to count statements")
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn distinct_categories(&self, user_id: &UserId) -> Result<Vec<Option<String>>> {
        let user_id = user_id.as_str().to_string();
        self.with_conn(move |conn| get_distinct_categories(conn, &user_id))
            .await
            .context("Failed to load categories")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AnalyticsFilter;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_user(conn: &Connection, user_id: &str, card_name: &str) -> Card {
        insert_user(
            conn,
            &User {
                id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
                name: user_id.to_string(),
            },
        )
        .unwrap();

        let card = Card {
            id: format!("{}-{}", user_id, card_name),
            user_id: user_id.to_string(),
            name: card_name.to_string(),
            color: "#4F46E5".to_string(),
        };
        insert_card(conn, &card).unwrap();
        card
    }

    fn create_test_transaction(
        statement: &Statement,
        day: NaiveDate,
        description: &str,
        amount: &str,
        tx_type: TransactionType,
        category: Option<&str>,
    ) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            statement_id: statement.id.clone(),
            date: day,
            description: description.to_string(),
            amount: amount.parse().unwrap(),
            transaction_type: tx_type,
            category: category.map(str::to_string),
        }
    }

    /// Two users: alice has Jan + Feb statements, bob has one in Jan
    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let alice = seed_user(&conn, "alice", "Visa");
        let jan = find_or_create_statement(&conn, &alice.id, date(2024, 1, 31)).unwrap();
        let feb = find_or_create_statement(&conn, &alice.id, date(2024, 2, 29)).unwrap();

        let bob = seed_user(&conn, "bob", "Amex");
        let bob_jan = find_or_create_statement(&conn, &bob.id, date(2024, 1, 31)).unwrap();

        let transactions = vec![
            create_test_transaction(&jan, date(2024, 1, 3), "GROCER", "-70.00", TransactionType::Debit, Some("Groceries")),
            create_test_transaction(&jan, date(2024, 1, 9), "CAFE", "-50.00", TransactionType::Debit, None),
            create_test_transaction(&jan, date(2024, 1, 20), "REFUND", "20.00", TransactionType::Credit, None),
            create_test_transaction(&feb, date(2024, 2, 11), "CAFE", "-80.00", TransactionType::Debit, Some("")),
            create_test_transaction(&bob_jan, date(2024, 1, 5), "HOTEL", "-900.00", TransactionType::Debit, Some("Travel")),
        ];
        insert_transactions(&conn, &transactions).unwrap();

        conn
    }

    #[test]
    fn test_idempotency_import_twice() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let card = seed_user(&conn, "alice", "Visa");
        let statement = find_or_create_statement(&conn, &card.id, date(2024, 12, 31)).unwrap();

        let transactions = vec![
            create_test_transaction(&statement, date(2024, 12, 30), "STARBUCKS #12345", "-45.99", TransactionType::Debit, Some("Dining")),
            create_test_transaction(&statement, date(2024, 12, 29), "AMAZON PURCHASE", "-120.50", TransactionType::Debit, Some("Shopping")),
        ];

        let first = insert_transactions(&conn, &transactions).unwrap();

        // Fresh ids, same content
        let again: Vec<Transaction> = transactions
            .iter()
            .map(|tx| Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                ..tx.clone()
            })
            .collect();
        let second = insert_transactions(&conn, &again).unwrap();

        assert_eq!(first, InsertSummary { inserted: 2, duplicates: 0 });
        assert_eq!(second, InsertSummary { inserted: 0, duplicates: 2 });

        let rows = get_transactions(&conn, &TransactionQuery::for_user(&UserId::new("alice"))).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_find_or_create_statement_reuses_billing_month() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let card = seed_user(&conn, "alice", "Visa");

        let first = find_or_create_statement(&conn, &card.id, date(2024, 3, 15)).unwrap();
        let second = find_or_create_statement(&conn, &card.id, date(2024, 3, 28)).unwrap();
        let april = find_or_create_statement(&conn, &card.id, date(2024, 4, 15)).unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, april.id);
        assert_eq!((april.year, april.month), (2024, 4));
    }

    #[test]
    fn test_transactions_are_scoped_to_owner() {
        let conn = seeded_connection();

        let alice = get_transactions(&conn, &TransactionQuery::for_user(&UserId::new("alice"))).unwrap();
        let bob = get_transactions(&conn, &TransactionQuery::for_user(&UserId::new("bob"))).unwrap();
        let nobody = get_transactions(&conn, &TransactionQuery::for_user(&UserId::new("mallory"))).unwrap();

        assert_eq!(alice.len(), 4);
        assert!(alice.iter().all(|r| r.card_id == "alice-Visa"));
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].category.as_deref(), Some("Travel"));
        assert!(nobody.is_empty());

        // Ordered by date
        let dates: Vec<NaiveDate> = alice.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_record_carries_statement_and_card() {
        let conn = seeded_connection();
        let rows = get_transactions(&conn, &TransactionQuery::for_user(&UserId::new("alice"))).unwrap();

        let refund = rows.iter().find(|r| r.description == "REFUND").unwrap();
        assert_eq!(refund.transaction_type, TransactionType::Credit);
        assert_eq!(refund.amount, "20.00".parse::<Decimal>().unwrap());
        assert_eq!((refund.statement_year, refund.statement_month), (2024, 1));
        assert_eq!(refund.card_name, "Visa");
        assert_eq!(refund.card_color, "#4F46E5");
    }

    #[test]
    fn test_date_card_and_category_filters() {
        let conn = seeded_connection();
        let alice = UserId::new("alice");

        let january = AnalyticsFilter {
            from: Some(date(2024, 1, 1)),
            to: Some(date(2024, 1, 31)),
            ..AnalyticsFilter::default()
        };
        assert_eq!(get_transactions(&conn, &january.scoped_to(&alice)).unwrap().len(), 3);

        let uncategorized = AnalyticsFilter {
            category: Some(UNCATEGORIZED.to_string()),
            ..AnalyticsFilter::default()
        };
        // NULL and blank categories both match
        assert_eq!(get_transactions(&conn, &uncategorized.scoped_to(&alice)).unwrap().len(), 3);

        let groceries = AnalyticsFilter {
            category: Some("Groceries".to_string()),
            ..AnalyticsFilter::default()
        };
        assert_eq!(get_transactions(&conn, &groceries.scoped_to(&alice)).unwrap().len(), 1);

        // Bob's card id cannot pull Bob's rows into Alice's scope
        let foreign_card = AnalyticsFilter {
            card_ids: vec!["bob-Amex".to_string()],
            ..AnalyticsFilter::default()
        };
        assert!(get_transactions(&conn, &foreign_card.scoped_to(&alice)).unwrap().is_empty());
        assert_eq!(count_cards(&conn, &foreign_card.scoped_to(&alice)).unwrap(), 0);
    }

    #[test]
    fn test_counts_and_distinct_categories() {
        let conn = seeded_connection();
        let alice = UserId::new("alice");

        assert_eq!(count_cards(&conn, &TransactionQuery::for_user(&alice)).unwrap(), 1);
        assert_eq!(count_statements(&conn, &TransactionQuery::for_user(&alice)).unwrap(), 2);

        let february = AnalyticsFilter {
            from: Some(date(2024, 2, 1)),
            ..AnalyticsFilter::default()
        };
        assert_eq!(count_statements(&conn, &february.scoped_to(&alice)).unwrap(), 1);

        let categories = get_distinct_categories(&conn, "alice").unwrap();
        assert_eq!(
            categories,
            vec![None, Some(String::new()), Some("Groceries".to_string())]
        );
    }

    #[test]
    fn test_category_filter_matches_labels() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let card = seed_user(&conn, "alice", "Visa");
        let jan = find_or_create_statement(&conn, &card.id, date(2024, 1, 31)).unwrap();

        insert_transactions(
            &conn,
            &[
                create_test_transaction(&jan, date(2024, 1, 2), "LABELLED", "-10.00", TransactionType::Debit, Some(UNCATEGORIZED)),
                create_test_transaction(&jan, date(2024, 1, 3), "BLANK", "-30.00", TransactionType::Debit, Some(" ")),
                create_test_transaction(&jan, date(2024, 1, 4), "PADDED", "-5.00", TransactionType::Debit, Some(" Dining ")),
            ],
        )
        .unwrap();

        let alice = UserId::new("alice");
        let uncategorized = AnalyticsFilter {
            category: Some(UNCATEGORIZED.to_string()),
            ..AnalyticsFilter::default()
        };
        let rows = get_transactions(&conn, &uncategorized.scoped_to(&alice)).unwrap();
        let descriptions: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["LABELLED", "BLANK"]);

        let dining = AnalyticsFilter {
            category: Some("Dining".to_string()),
            ..AnalyticsFilter::default()
        };
        let rows = get_transactions(&conn, &dining.scoped_to(&alice)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_label(), "Dining");
    }

    #[test]
    fn test_card_count_ignores_date_range_and_category() {
        let conn = seeded_connection();
        let narrowed = AnalyticsFilter {
            from: Some(date(2030, 1, 1)),
            to: Some(date(2030, 12, 31)),
            category: Some("Groceries".to_string()),
            ..AnalyticsFilter::default()
        };
        let query = narrowed.scoped_to(&UserId::new("alice"));

        assert_eq!(count_cards(&conn, &query).unwrap(), 1);
        assert_eq!(count_statements(&conn, &query).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_async_store_round_trip() {
        let store = SqliteStore::from_connection(seeded_connection());

        assert!(store.user_exists(&UserId::new("alice")).await.unwrap());
        assert!(!store.user_exists(&UserId::new("mallory")).await.unwrap());

        let query = TransactionQuery::for_user(&UserId::new("bob"));
        let (rows, cards, statements) = tokio::try_join!(
            store.fetch_transactions(&query),
            store.count_cards(&query),
            store.count_statements(&query),
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(cards, 1);
        assert_eq!(statements, 1);
    }
}
