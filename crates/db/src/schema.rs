//! One-time bootstrap of the database file and the `Customer` table.
//!
//! The reporting tables (`Invoice`, `InvoiceLine`, `Track`, `Genre`) belong to
//! the wider Chinook schema and are never created here.

use sqlx::migrate::MigrateDatabase;
use sqlx::Sqlite;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::connection::{connect_with_settings, DbPool};

pub const CUSTOMER_TABLE: &str = "Customer";

const CREATE_CUSTOMER_TABLE: &str = "CREATE TABLE Customer (
    CustomerId INTEGER PRIMARY KEY AUTOINCREMENT,
    FirstName VARCHAR(40) NOT NULL,
    LastName VARCHAR(20) NOT NULL,
    Email VARCHAR(60) NOT NULL,
    Phone VARCHAR(24),
    Country VARCHAR(40),
    PostalCode VARCHAR(10)
)";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("could not check whether database `{url}` exists: {source}")]
    Probe { url: String, source: sqlx::Error },
    #[error("could not create database `{url}`: {source}")]
    CreateDatabase { url: String, source: sqlx::Error },
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("catalog lookup for table `{table}` failed: {source}")]
    CatalogLookup { table: &'static str, source: sqlx::Error },
    #[error("could not create table `{table}`: {source}")]
    CreateTable { table: &'static str, source: sqlx::Error },
}

/// Proof that the schema bootstrap completed. Repositories backed by SQL can
/// only be built from one of these.
#[derive(Clone, Debug)]
pub struct InitializedSchema {
    pool: DbPool,
    database_created: bool,
    customer_table_created: bool,
}

impl InitializedSchema {
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn database_created(&self) -> bool {
        self.database_created
    }

    pub fn customer_table_created(&self) -> bool {
        self.customer_table_created
    }
}

pub struct SchemaInitializer {
    database_url: String,
    max_connections: u32,
    timeout_secs: u64,
    ready: OnceCell<InitializedSchema>,
}

impl SchemaInitializer {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 1,
            timeout_secs: 30,
            ready: OnceCell::new(),
        }
    }

    pub fn with_pool_settings(mut self, max_connections: u32, timeout_secs: u64) -> Self {
        self.max_connections = max_connections;
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Runs the bootstrap at most once. A failed attempt leaves the guard
    /// unset, so the next call starts over.
    pub async fn ensure_initialized(&self) -> Result<InitializedSchema, SchemaError> {
        if let Some(schema) = self.ready.get() {
            debug!(event_name = "db.schema.already_initialized", "schema bootstrap skipped");
            return Ok(schema.clone());
        }

        let schema = self.ready.get_or_try_init(|| self.initialize()).await?;
        Ok(schema.clone())
    }

    async fn initialize(&self) -> Result<InitializedSchema, SchemaError> {
        let url = self.database_url.as_str();
        info!(
            event_name = "db.schema.bootstrap.start",
            database_url = url,
            "starting schema bootstrap"
        );

        let exists = Sqlite::database_exists(url)
            .await
            .map_err(|source| SchemaError::Probe { url: url.to_string(), source })?;
        if !exists {
            Sqlite::create_database(url)
                .await
                .map_err(|source| SchemaError::CreateDatabase { url: url.to_string(), source })?;
            info!(
                event_name = "db.schema.database_created",
                database_url = url,
                "database created"
            );
        }

        let pool = connect_with_settings(url, self.max_connections, self.timeout_secs)
            .await
            .map_err(SchemaError::Connect)?;

        let customer_table_created = if table_exists(&pool, CUSTOMER_TABLE).await? {
            false
        } else {
            sqlx::query(CREATE_CUSTOMER_TABLE)
                .execute(&pool)
                .await
                .map_err(|source| SchemaError::CreateTable { table: CUSTOMER_TABLE, source })?;
            info!(event_name = "db.schema.table_created", table = CUSTOMER_TABLE, "table created");
            true
        };

        info!(
            event_name = "db.schema.bootstrap.complete",
            database_created = !exists,
            customer_table_created,
            "schema bootstrap complete"
        );

        Ok(InitializedSchema { pool, database_created: !exists, customer_table_created })
    }
}

pub async fn table_exists(pool: &DbPool, table: &'static str) -> Result<bool, SchemaError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await
            .map_err(|source| SchemaError::CatalogLookup { table, source })?;
    Ok(count > 0)
}
