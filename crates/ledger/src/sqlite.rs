use {
    async_trait::async_trait,
    chrono::NaiveDate,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tally_common::types::IntentType,
    tally_service_traits::{
        IdentityStore, Ledger, LedgerEntry, LedgerTotals, NewEntry, ServiceError, ServiceResult,
        User,
    },
    tracing::debug,
};

use crate::{
    display_name_for,
    error::{Context, Result},
    new_user_id, normalize_email,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ledger and identity store backed by SQLite.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Connect to `url` and create the schema if missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        Self::init(&pool).await?;
        debug!(url, "sqlite ledger ready");
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id           TEXT    PRIMARY KEY,
                email        TEXT    NOT NULL UNIQUE,
                display_name TEXT    NOT NULL,
                created_at   INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS address_bindings (
                address TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id)
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS entries (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT    NOT NULL,
                kind        TEXT    NOT NULL,
                amount      REAL    NOT NULL,
                category    TEXT    NOT NULL,
                description TEXT    NOT NULL,
                date        TEXT    NOT NULL,
                created_at  INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_user ON entries(user_id, id)")
            .execute(pool)
            .await
            .ok();

        Ok(())
    }

    async fn fetch_entry(&self, user_id: &str, entry_id: i64) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, EntryRow>("SELECT * FROM entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn record(&self, entry: NewEntry) -> ServiceResult<LedgerEntry> {
        let created_at = tally_common::now_ms();
        let result = sqlx::query(
            r#"INSERT INTO entries (user_id, kind, amount, category, description, date, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&entry.user_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.category)
        .bind(&entry.description)
        .bind(entry.date.format(DATE_FORMAT).to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(LedgerEntry {
            id: result.last_insert_rowid(),
            user_id: entry.user_id,
            kind: entry.kind,
            amount: entry.amount,
            category: entry.category,
            description: entry.description,
            date: entry.date,
            created_at,
        })
    }

    async fn recent_entries(&self, user_id: &str, limit: usize) -> ServiceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT * FROM entries WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(rows
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn last_entry(&self, user_id: &str) -> ServiceResult<Option<LedgerEntry>> {
        Ok(self.recent_entries(user_id, 1).await?.into_iter().next())
    }

    async fn delete_entry(&self, user_id: &str, entry_id: i64) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(crate::Error::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_amount(
        &self,
        user_id: &str,
        entry_id: i64,
        amount: f64,
    ) -> ServiceResult<Option<LedgerEntry>> {
        let result = sqlx::query("UPDATE entries SET amount = ? WHERE id = ? AND user_id = ?")
            .bind(amount)
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(crate::Error::from)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.fetch_entry(user_id, entry_id).await?)
    }

    async fn totals(&self, user_id: &str, since: Option<NaiveDate>) -> ServiceResult<LedgerTotals> {
        let since = since.map_or_else(String::new, |d| d.format(DATE_FORMAT).to_string());
        let rows: Vec<(String, f64)> =
            sqlx::query_as("SELECT kind, amount FROM entries WHERE user_id = ? AND date >= ?")
                .bind(user_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await
                .map_err(crate::Error::from)?;

        let mut totals = LedgerTotals::default();
        for (kind, amount) in rows {
            totals.add(IntentType::parse_lenient(&kind), amount);
        }
        Ok(totals)
    }
}

#[async_trait]
impl IdentityStore for SqliteLedger {
    async fn find_by_address(&self, address: &str) -> ServiceResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT u.* FROM users u
               JOIN address_bindings b ON b.user_id = u.id
               WHERE b.address = ?"#,
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(row.map(Into::into))
    }

    async fn get_or_create_user(&self, email: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::message("email is required"));
        }
        sqlx::query(
            r#"INSERT INTO users (id, email, display_name, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(email) DO NOTHING"#,
        )
        .bind(new_user_id())
        .bind(&email)
        .bind(display_name_for(&email))
        .bind(tally_common::now_ms())
        .execute(&self.pool)
        .await
        .map_err(crate::Error::from)?;

        Ok(self
            .user_by_email(&email)
            .await?
            .context("user vanished after insert")?)
    }

    async fn bind_address(&self, address: &str, user_id: &str) -> ServiceResult {
        let bound: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM address_bindings WHERE address = ?")
                .bind(address)
                .fetch_optional(&self.pool)
                .await
                .map_err(crate::Error::from)?;
        match bound {
            Some((bound_to,)) if bound_to != user_id => Err(ServiceError::Conflict {
                address: address.to_string(),
                bound_to,
            }),
            Some(_) => Ok(()),
            None => self.rebind_address(address, user_id).await,
        }
    }

    async fn rebind_address(&self, address: &str, user_id: &str) -> ServiceResult {
        sqlx::query(
            r#"INSERT INTO address_bindings (address, user_id) VALUES (?, ?)
               ON CONFLICT(address) DO UPDATE SET user_id = excluded.user_id"#,
        )
        .bind(address)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(crate::Error::from)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    user_id: String,
    kind: String,
    amount: f64,
    category: String,
    description: String,
    date: String,
    created_at: i64,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = crate::Error;

    fn try_from(r: EntryRow) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&r.date, DATE_FORMAT)
            .with_context(|| format!("entry {} has invalid date {:?}", r.id, r.date))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            kind: IntentType::parse_lenient(&r.kind),
            amount: r.amount,
            category: r.category,
            description: r.description,
            date,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: String,
    created_at: i64,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            display_name: r.display_name,
            email: r.email,
            created_at: r.created_at,
        }
    }
}
