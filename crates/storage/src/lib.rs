use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, Row, SqlitePool};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use domainhub_core::{Account, AccountRepository, Domain, DomainRepository, RepositoryError};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to the `account` table.
    pub fn accounts(&self) -> SqliteAccountRepository {
        SqliteAccountRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to the `domain` table.
    pub fn domains(&self) -> SqliteDomainRepository {
        SqliteDomainRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// Errors raised while bootstrapping the database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Account repository backed by the `account` table.
#[derive(Clone)]
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: String,
    firebase_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            firebase_id: row.firebase_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn get(&self, id: &str) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, firebase_id, created_at, updated_at FROM account WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", err))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM account")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("account", err))?;
        let total: i64 = row.get("total");
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn query(&self, offset: u64, limit: u64) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, firebase_id, created_at, updated_at \
             FROM account ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(to_sql_int(limit))
        .bind(to_sql_int(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", err))?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn create(&self, mut account: Account) -> Result<Account, RepositoryError> {
        if account.id.is_empty() {
            account.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            "INSERT INTO account (id, email, firebase_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.firebase_id)
        .bind(to_rfc3339(account.created_at))
        .bind(to_rfc3339(account.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", err))?;

        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account \
             SET email = ?, firebase_id = ?, created_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&account.email)
        .bind(&account.firebase_id)
        .bind(to_rfc3339(account.created_at))
        .bind(to_rfc3339(account.updated_at))
        .bind(&account.id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", err))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let account = self.get(id).await?;
        sqlx::query("DELETE FROM account WHERE id = ?")
            .bind(&account.id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("account", err))?;
        Ok(())
    }
}

/// Domain repository backed by the `domain` table. Every statement filters
/// on `account_id`.
#[derive(Clone)]
pub struct SqliteDomainRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct DomainRow {
    id: String,
    account_id: String,
    domain: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DomainRow> for Domain {
    fn from(row: DomainRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            domain: row.domain,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DomainRepository for SqliteDomainRepository {
    async fn get(&self, id: &str, account_id: &str) -> Result<Domain, RepositoryError> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, account_id, domain, created_at, updated_at \
             FROM domain WHERE id = ? AND account_id = ?",
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("domain", err))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn count(&self, account_id: &str) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM domain WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("domain", err))?;
        let total: i64 = row.get("total");
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn query(
        &self,
        offset: u64,
        limit: u64,
        account_id: &str,
    ) -> Result<Vec<Domain>, RepositoryError> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT id, account_id, domain, created_at, updated_at \
             FROM domain WHERE account_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(account_id)
        .bind(to_sql_int(limit))
        .bind(to_sql_int(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("domain", err))?;

        Ok(rows.into_iter().map(Domain::from).collect())
    }

    async fn create(&self, mut domain: Domain) -> Result<Domain, RepositoryError> {
        if domain.id.is_empty() {
            domain.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            "INSERT INTO domain (id, account_id, domain, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&domain.id)
        .bind(&domain.account_id)
        .bind(&domain.domain)
        .bind(to_rfc3339(domain.created_at))
        .bind(to_rfc3339(domain.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("domain", err))?;

        Ok(domain)
    }

    async fn update(&self, domain: &Domain) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE domain \
             SET domain = ?, created_at = ?, updated_at = ? \
             WHERE id = ? AND account_id = ?",
        )
        .bind(&domain.domain)
        .bind(to_rfc3339(domain.created_at))
        .bind(to_rfc3339(domain.updated_at))
        .bind(&domain.id)
        .bind(&domain.account_id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("domain", err))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str, account_id: &str) -> Result<(), RepositoryError> {
        let domain = self.get(id, account_id).await?;
        sqlx::query("DELETE FROM domain WHERE id = ? AND account_id = ?")
            .bind(&domain.id)
            .bind(&domain.account_id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("domain", err))?;
        Ok(())
    }
}

/// Translates sqlx failures into repository errors, naming SQLite
/// constraint codes (2067/1555 unique, 787 foreign key) explicitly.
fn map_sqlx_error(table: &'static str, err: sqlx::Error) -> RepositoryError {
    let detail = match err {
        sqlx::Error::RowNotFound => return RepositoryError::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("2067") | Some("1555") => {
                format!("unique constraint violated: {}", db_err.message())
            }
            Some("787") => "foreign key constraint violated".to_string(),
            _ => db_err.message().to_string(),
        },
        other => other.to_string(),
    };
    warn!(stage = "storage", table, error = %detail, "sqlite statement failed");
    RepositoryError::Storage(format!("{table}: {detail}"))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
