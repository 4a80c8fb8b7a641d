use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::path::Path;
use tally_core::{AmountParseError, EnrichedTransaction, Money};
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

pub const DEFAULT_TABLE: &str = "transactions";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),
    #[error("Stored amount is not a number: {0}")]
    Amount(#[from] AmountParseError),
}

/// A row read back from the export table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransaction {
    pub id: i64,
    pub transaction_date: NaiveDate,
    pub raw_description: String,
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub year_month: String,
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA cache_size = -32000")
        .execute(&pool)
        .await?;

    Ok(pool)
}

/// Table names are interpolated into DDL, so only plain identifiers pass.
fn checked_table(table: &str) -> Result<&str, StorageError> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(table)
    } else {
        Err(StorageError::InvalidTableName(table.to_string()))
    }
}

async fn recreate_table(conn: &mut sqlx::SqliteConnection, table: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(&mut *conn)
        .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_date TEXT NOT NULL,
            raw_description TEXT NOT NULL,
            description TEXT NOT NULL,
            amount NUMERIC(10, 2) NOT NULL,
            category TEXT NOT NULL,
            year_month TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#
    ))
    .execute(&mut *conn)
    .await?;

    for column in ["transaction_date", "category", "year_month", "description"] {
        sqlx::query(&format!(
            "CREATE INDEX idx_{table}_{column} ON {table}({column})"
        ))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Replaces the contents of `table` with `transactions`, in one database
/// transaction. Returns the number of rows written.
pub async fn replace_transactions(
    pool: &DbPool,
    table: &str,
    transactions: &[EnrichedTransaction],
) -> Result<u64, StorageError> {
    let table = checked_table(table)?;
    let mut tx = pool.begin().await?;

    recreate_table(&mut tx, table).await?;

    let insert = format!(
        "INSERT INTO {table} (transaction_date, raw_description, description, amount, category, year_month) VALUES (?, ?, ?, ?, ?, ?)"
    );
    let mut written = 0;
    for t in transactions {
        let result = sqlx::query(&insert)
            .bind(t.date)
            .bind(&t.raw_description)
            .bind(&t.description)
            .bind(t.amount.as_decimal().to_string())
            .bind(&t.category)
            .bind(t.year_month())
            .execute(&mut *tx)
            .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    tracing::info!(table, rows = written, "exported transactions");
    Ok(written)
}

/// Newest rows first, by transaction date then insertion order.
pub async fn recent_transactions(
    pool: &DbPool,
    table: &str,
    limit: u32,
) -> Result<Vec<StoredTransaction>, StorageError> {
    let table = checked_table(table)?;
    let rows = sqlx::query_as::<_, (i64, NaiveDate, String, String, String, String, String)>(&format!(
        "SELECT id, transaction_date, raw_description, description, printf('%.2f', amount), category, year_month FROM {table} ORDER BY transaction_date DESC, id DESC LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| -> Result<StoredTransaction, StorageError> {
            Ok(StoredTransaction {
                id: r.0,
                transaction_date: r.1,
                raw_description: r.2,
                description: r.3,
                amount: r.4.parse()?,
                category: r.5,
                year_month: r.6,
            })
        })
        .collect()
}
