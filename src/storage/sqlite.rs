use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Card, TransactionRecord, TransactionType};
use crate::storage::{LedgerStore, StoreError};
use crate::types::Monetary;

const CREATE_CARDS: &str = "\
CREATE TABLE IF NOT EXISTS cards (
    uid TEXT PRIMARY KEY,
    holder_name TEXT NOT NULL,
    balance TEXT NOT NULL,
    last_topup_amount TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const CREATE_TRANSACTIONS: &str = "\
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    uid TEXT NOT NULL,
    holder_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    amount TEXT NOT NULL,
    balance_before TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const CREATE_TRANSACTIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_uid ON transactions (uid)";

const UPSERT_CARD: &str = "\
INSERT INTO cards (uid, holder_name, balance, last_topup_amount, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT (uid) DO UPDATE SET
    balance = excluded.balance,
    last_topup_amount = excluded.last_topup_amount,
    updated_at = excluded.updated_at";

const INSERT_TRANSACTION: &str = "\
INSERT INTO transactions (id, uid, holder_name, kind, amount, balance_before, balance_after, description, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SELECT_CARD: &str = "SELECT * FROM cards WHERE uid = ?1";
const SELECT_CARDS: &str = "SELECT * FROM cards ORDER BY updated_at DESC";
const SELECT_TRANSACTIONS: &str =
    "SELECT * FROM transactions ORDER BY created_at DESC, rowid DESC LIMIT ?1";
const SELECT_CARD_TRANSACTIONS: &str =
    "SELECT * FROM transactions WHERE uid = ?1 ORDER BY created_at DESC, rowid DESC";

/// SQLite-backed ledger.
///
/// Monetary values and timestamps are stored as TEXT; timestamps use a
/// fixed-precision RFC 3339 form so lexicographic ordering matches
/// chronological ordering. Card update and record append share one database
/// transaction.
pub struct SqliteLedger {
    pool: SqlitePool
}

impl SqliteLedger {
    /// Opens (creating if missing) the database at `url` and prepares the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|error| StoreError::Connection(error.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|error| StoreError::Connection(error.to_string()))?;

        sqlx::query(CREATE_CARDS).execute(&pool).await?;
        sqlx::query(CREATE_TRANSACTIONS).execute(&pool).await?;
        sqlx::query(CREATE_TRANSACTIONS_INDEX).execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn load_card(&self, uid: &str) -> Result<Option<Card>, StoreError> {
        let row = sqlx::query(SELECT_CARD)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(card_from_row).transpose()
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        let rows = sqlx::query(SELECT_CARDS).fetch_all(&self.pool).await?;

        rows.iter().map(card_from_row).collect()
    }

    async fn record_topup(&self, card: &Card, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(UPSERT_CARD)
            .bind(&card.uid)
            .bind(&card.holder_name)
            .bind(card.balance.to_string())
            .bind(card.last_topup_amount.to_string())
            .bind(encode_time(&card.created_at))
            .bind(encode_time(&card.updated_at))
            .execute(&mut *tx)
            .await?;

        sqlx::query(INSERT_TRANSACTION)
            .bind(record.id.to_string())
            .bind(&record.uid)
            .bind(&record.holder_name)
            .bind(record.kind.to_string())
            .bind(record.amount.to_string())
            .bind(record.balance_before.to_string())
            .bind(record.balance_after.to_string())
            .bind(&record.description)
            .bind(encode_time(&record.created_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn list_transactions(&self, limit: usize) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query(SELECT_TRANSACTIONS)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn card_transactions(&self, uid: &str) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query(SELECT_CARD_TRANSACTIONS)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn card_from_row(row: &SqliteRow) -> Result<Card, StoreError> {
    Ok(Card {
        uid: row.try_get("uid")?,
        holder_name: row.try_get("holder_name")?,
        balance: decode_amount(&row.try_get::<String, _>("balance")?)?,
        last_topup_amount: decode_amount(&row.try_get::<String, _>("last_topup_amount")?)?,
        created_at: decode_time(&row.try_get::<String, _>("created_at")?)?,
        updated_at: decode_time(&row.try_get::<String, _>("updated_at")?)?
    })
}

fn record_from_row(row: &SqliteRow) -> Result<TransactionRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;

    Ok(TransactionRecord {
        id: Uuid::parse_str(&id).map_err(|error| StoreError::Corrupt(error.to_string()))?,
        uid: row.try_get("uid")?,
        holder_name: row.try_get("holder_name")?,
        kind: TransactionType::from_str(&kind).map_err(StoreError::Corrupt)?,
        amount: decode_amount(&row.try_get::<String, _>("amount")?)?,
        balance_before: decode_amount(&row.try_get::<String, _>("balance_before")?)?,
        balance_after: decode_amount(&row.try_get::<String, _>("balance_after")?)?,
        description: row.try_get("description")?,
        created_at: decode_time(&row.try_get::<String, _>("created_at")?)?
    })
}

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|error| StoreError::Corrupt(error.to_string()))
}

fn decode_amount(text: &str) -> Result<Monetary, StoreError> {
    Monetary::from_str(text).map_err(|error| StoreError::Corrupt(error.to_string()))
}
