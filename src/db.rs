use std::str::FromStr;

use once_cell::sync::Lazy;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::User;
use crate::error::AppError;
use crate::models::{NewTaxRecord, TaxFigures, TaxRecord};
use crate::repository::Repository;

fn quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("\"{}\"", column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn stored_columns() -> Vec<&'static str> {
    let mut columns = vec!["FirmName", "Date_Period"];
    columns.extend_from_slice(TaxFigures::COLUMNS);
    columns.extend_from_slice(&["file", "file_name", "user_id"]);
    columns
}

static INSERT_RECORD_SQL: Lazy<String> = Lazy::new(|| {
    let columns = stored_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO tax_records ({}) VALUES ({})",
        quoted(&columns),
        placeholders
    )
});

static SELECT_RECORDS_SQL: Lazy<String> = Lazy::new(|| {
    let mut columns = vec!["id"];
    columns.extend(stored_columns());
    format!("SELECT {} FROM tax_records", quoted(&columns))
});

static SELECT_USER_RECORDS_SQL: Lazy<String> =
    Lazy::new(|| format!("{} WHERE user_id = ? ORDER BY id", *SELECT_RECORDS_SQL));

static SELECT_ALL_RECORDS_SQL: Lazy<String> =
    Lazy::new(|| format!("{} ORDER BY id", *SELECT_RECORDS_SQL));

#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRepository {
    /// Opens (creating if needed) the database at `database_url` and applies
    /// the bundled migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database. A single long-lived connection keeps the
    /// data alive for the lifetime of the pool.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations completed successfully");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[rocket::async_trait]
impl Repository for SqliteRepository {
    #[instrument(skip(self, record), fields(user_id = record.user_id))]
    async fn insert_record(&self, record: NewTaxRecord) -> Result<i64, AppError> {
        info!("Inserting tax record");

        let mut query = sqlx::query(INSERT_RECORD_SQL.as_str())
            .bind(record.firm_name)
            .bind(record.date_period);
        for value in record.figures.values() {
            query = query.bind(value);
        }
        let result = query
            .bind(record.file)
            .bind(record.file_name)
            .bind(record.user_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(res) => Ok(res.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
                AppError::NotFound(format!("User with id {} not found", record.user_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list_records_for_user(&self, user_id: i64) -> Result<Vec<TaxRecord>, AppError> {
        info!("Fetching records for user");
        let records = sqlx::query_as::<_, TaxRecord>(SELECT_USER_RECORDS_SQL.as_str())
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn list_all_records(&self) -> Result<Vec<TaxRecord>, AppError> {
        info!("Fetching all records");
        let records = sqlx::query_as::<_, TaxRecord>(SELECT_ALL_RECORDS_SQL.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn latest_file_key(&self, file_name: &str) -> Result<Option<String>, AppError> {
        let key = sqlx::query_scalar::<_, String>(
            "SELECT \"file\" FROM tax_records \
             WHERE \"file_name\" = ? AND \"file\" IS NOT NULL \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    #[instrument(skip(self))]
    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, is_admin FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, password_hash))]
    async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, AppError> {
        info!("Creating new user");

        let result =
            sqlx::query("INSERT INTO users (username, password, is_admin) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(is_admin)
                .execute(&self.pool)
                .await;

        match result {
            Ok(res) => Ok(res.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
