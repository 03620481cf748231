use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use schemaport_core::{Error, Result};

use crate::statement::{BindValue, InsertStatement};

/// Destination of one import run. Every call before `commit` belongs to a
/// single transaction; `rollback` discards all of it.
#[async_trait]
pub trait ImportTarget: Send + Sized {
    /// Run a multi-statement DDL script.
    async fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Execute one insert and return the number of rows written.
    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Pool settings for [`ImportContext::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Connection pool shared by imports and reads.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pool: PgPool,
}

impl ImportContext {
    pub async fn connect(database_url: &str, options: &ConnectOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Use a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open the import transaction for `dataset`.
    ///
    /// A transaction-scoped advisory lock keyed on the dataset name makes
    /// concurrent imports of the same dataset wait for each other.
    pub async fn begin(&self, dataset: &str) -> Result<PgImportTarget> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("select pg_advisory_xact_lock(hashtext($1))")
            .bind(dataset)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tracing::debug!(event = "import_lock_acquired", dataset = %dataset);
        Ok(PgImportTarget { tx })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Postgres transaction used as an import target.
#[derive(Debug)]
pub struct PgImportTarget {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ImportTarget for PgImportTarget {
    async fn execute_script(&mut self, script: &str) -> Result<()> {
        sqlx::Executor::execute(&mut *self.tx, sqlx::raw_sql(script))
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = match param {
                BindValue::Text(value) => query.bind(value.clone()),
                BindValue::TextArray(values) => query.bind(values.clone()),
            };
        }
        let result = query.execute(&mut *self.tx).await.map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(db_error)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(db_error)
    }
}

pub(crate) fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}
