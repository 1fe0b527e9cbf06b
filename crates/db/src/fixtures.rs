//! Minimal stand-ins for the Chinook sales tables the reporting queries read.
//!
//! Only the columns the reports touch are created, so these helpers target
//! scratch databases and tests, not a full Chinook install.

use rust_decimal::Decimal;

use chinook_core::domain::customer::CustomerId;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const CATALOG_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS Genre (
        GenreId INTEGER PRIMARY KEY AUTOINCREMENT,
        Name VARCHAR(120)
    )",
    "CREATE TABLE IF NOT EXISTS Track (
        TrackId INTEGER PRIMARY KEY AUTOINCREMENT,
        Name VARCHAR(200) NOT NULL,
        GenreId INTEGER REFERENCES Genre (GenreId)
    )",
    "CREATE TABLE IF NOT EXISTS Invoice (
        InvoiceId INTEGER PRIMARY KEY AUTOINCREMENT,
        CustomerId INTEGER NOT NULL,
        Total NUMERIC(10, 2) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS InvoiceLine (
        InvoiceLineId INTEGER PRIMARY KEY AUTOINCREMENT,
        InvoiceId INTEGER NOT NULL REFERENCES Invoice (InvoiceId),
        TrackId INTEGER NOT NULL REFERENCES Track (TrackId)
    )",
];

/// One invoice: a total plus one line per purchased track, each tagged with
/// its genre name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceFixture {
    pub customer_id: CustomerId,
    pub total: Decimal,
    pub track_genres: Vec<String>,
}

impl InvoiceFixture {
    pub fn new(customer_id: CustomerId, total: Decimal) -> Self {
        Self { customer_id, total, track_genres: Vec::new() }
    }

    pub fn with_tracks(mut self, genre: &str, count: usize) -> Self {
        self.track_genres.extend(std::iter::repeat(genre.to_string()).take(count));
        self
    }
}

pub async fn ensure_catalog_tables(pool: &DbPool) -> Result<(), RepositoryError> {
    for statement in CATALOG_DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Inserts the invoice, its lines, and any genre or track rows it needs.
/// Returns the new invoice id.
pub async fn insert_invoice(
    pool: &DbPool,
    invoice: &InvoiceFixture,
) -> Result<i64, RepositoryError> {
    let invoice_id = sqlx::query("INSERT INTO Invoice (CustomerId, Total) VALUES (?, ?)")
        .bind(invoice.customer_id.0)
        .bind(invoice.total.to_string())
        .execute(pool)
        .await?
        .last_insert_rowid();

    for (position, genre) in invoice.track_genres.iter().enumerate() {
        let genre_id = genre_id_for(pool, genre).await?;
        let track_id = sqlx::query("INSERT INTO Track (Name, GenreId) VALUES (?, ?)")
            .bind(format!("{genre} #{invoice_id}.{position}"))
            .bind(genre_id)
            .execute(pool)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO InvoiceLine (InvoiceId, TrackId) VALUES (?, ?)")
            .bind(invoice_id)
            .bind(track_id)
            .execute(pool)
            .await?;
    }

    Ok(invoice_id)
}

pub async fn seed_invoices(
    pool: &DbPool,
    invoices: &[InvoiceFixture],
) -> Result<Vec<i64>, RepositoryError> {
    ensure_catalog_tables(pool).await?;

    let mut ids = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        ids.push(insert_invoice(pool, invoice).await?);
    }
    Ok(ids)
}

async fn genre_id_for(pool: &DbPool, name: &str) -> Result<i64, RepositoryError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT GenreId FROM Genre WHERE Name = ? ORDER BY GenreId LIMIT 1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let result =
        sqlx::query("INSERT INTO Genre (Name) VALUES (?)").bind(name).execute(pool).await?;
    Ok(result.last_insert_rowid())
}
