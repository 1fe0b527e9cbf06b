use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use chinook_core::domain::customer::{Customer, CustomerId, NewCustomer};
use chinook_core::domain::report::{CustomerCountrySummary, CustomerGenreSummary, HighSpender};
use chinook_core::validation::require_names;

use super::{parse_u32, CustomerStore, RepositoryError};
use crate::schema::InitializedSchema;
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(schema: &InitializedSchema) -> Self {
        Self { pool: schema.pool().clone() }
    }
}

#[async_trait::async_trait]
impl CustomerStore for SqlCustomerRepository {
    async fn get_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone, Country, PostalCode
             FROM Customer",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(customer_from_row).collect()
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone, Country, PostalCode
             FROM Customer
             WHERE CustomerId = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    /// SQLite `LIKE` folds only ASCII, so rows are scanned in id order and
    /// matched with Unicode lowercasing.
    async fn get_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError> {
        let needle = query.to_lowercase();
        let rows = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone, Country, PostalCode
             FROM Customer
             ORDER BY CustomerId ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let customer = customer_from_row(row)?;
            if customer.name_contains_lowercase(&needle) {
                return Ok(Some(customer));
            }
        }
        Ok(None)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone, Country, PostalCode
             FROM Customer
             WHERE Email = ?
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn add(&self, customer: NewCustomer) -> Result<CustomerId, RepositoryError> {
        require_names(&customer.first_name, &customer.last_name)?;

        let result = sqlx::query(
            "INSERT INTO Customer (FirstName, LastName, Email, Phone, Country, PostalCode)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.country)
        .bind(&customer.postal_code)
        .execute(&self.pool)
        .await?;

        let id = CustomerId(result.last_insert_rowid());
        debug!(event_name = "db.customer.added", customer_id = id.0, "customer inserted");
        Ok(id)
    }

    async fn update(&self, customer: Customer) -> Result<(), RepositoryError> {
        require_names(&customer.first_name, &customer.last_name)?;

        let result = sqlx::query(
            "UPDATE Customer
             SET FirstName = ?,
                 LastName = ?,
                 Email = ?,
                 Phone = ?,
                 Country = ?,
                 PostalCode = ?
             WHERE CustomerId = ?",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.country)
        .bind(&customer.postal_code)
        .bind(customer.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(customer.id));
        }

        debug!(event_name = "db.customer.updated", customer_id = customer.id.0, "customer updated");
        Ok(())
    }

    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM Customer WHERE CustomerId = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        debug!(
            event_name = "db.customer.deleted",
            customer_id = id.0,
            rows_affected = result.rows_affected(),
            "customer delete executed"
        );
        Ok(())
    }

    async fn get_paged(&self, limit: u32, offset: u32) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone, Country, PostalCode
             FROM Customer
             ORDER BY CustomerId ASC
             LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(customer_from_row).collect()
    }

    async fn get_count_by_country_descending(
        &self,
    ) -> Result<Vec<CustomerCountrySummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT COALESCE(Country, '') AS CountryName, COUNT(*) AS CustomerCount
             FROM Customer
             GROUP BY COALESCE(Country, '')
             ORDER BY CustomerCount DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(country_summary_from_row).collect()
    }

    async fn get_high_spenders_descending(&self) -> Result<Vec<HighSpender>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                c.CustomerId,
                c.FirstName,
                c.LastName,
                c.Email,
                c.Phone,
                c.Country,
                c.PostalCode,
                printf('%.2f', SUM(i.Total)) AS TotalSpent
             FROM Invoice i
             INNER JOIN Customer c ON i.CustomerId = c.CustomerId
             GROUP BY c.CustomerId
             ORDER BY SUM(i.Total) DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(high_spender_from_row).collect()
    }

    async fn get_most_popular_genres_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerGenreSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                g.Name AS GenreName,
                COUNT(DISTINCT i.CustomerId) AS CustomerCount,
                COUNT(DISTINCT i.InvoiceId) AS PurchaseCount,
                COUNT(*) AS TrackCount
             FROM InvoiceLine il
             INNER JOIN Invoice i ON il.InvoiceId = i.InvoiceId
             INNER JOIN Track t ON il.TrackId = t.TrackId
             INNER JOIN Genre g ON t.GenreId = g.GenreId
             WHERE i.CustomerId = ?
             GROUP BY g.Name
             HAVING COUNT(*) = (
                SELECT MAX(GenreTrackCount)
                FROM (
                    SELECT COUNT(*) AS GenreTrackCount
                    FROM InvoiceLine il2
                    INNER JOIN Invoice i2 ON il2.InvoiceId = i2.InvoiceId
                    INNER JOIN Track t2 ON il2.TrackId = t2.TrackId
                    INNER JOIN Genre g2 ON t2.GenreId = g2.GenreId
                    WHERE i2.CustomerId = ?
                    GROUP BY g2.Name
                ) AS GenreCounts
             )",
        )
        .bind(customer_id.0)
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(genre_summary_from_row).collect()
    }
}

// Optional columns written by other tools may hold NULL; they read back as "".
fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(row.try_get("CustomerId")?),
        first_name: row.try_get("FirstName")?,
        last_name: row.try_get("LastName")?,
        email: row.try_get("Email")?,
        phone: row.try_get::<Option<String>, _>("Phone")?.unwrap_or_default(),
        country: row.try_get::<Option<String>, _>("Country")?.unwrap_or_default(),
        postal_code: row.try_get::<Option<String>, _>("PostalCode")?.unwrap_or_default(),
    })
}

fn country_summary_from_row(row: SqliteRow) -> Result<CustomerCountrySummary, RepositoryError> {
    Ok(CustomerCountrySummary {
        country: row.try_get("CountryName")?,
        customer_count: parse_u32("CustomerCount", row.try_get("CustomerCount")?)?,
    })
}

fn high_spender_from_row(row: SqliteRow) -> Result<HighSpender, RepositoryError> {
    let total_raw: String = row.try_get("TotalSpent")?;
    let total_spent = parse_decimal("TotalSpent", &total_raw)?;
    Ok(HighSpender { customer: customer_from_row(row)?, total_spent })
}

fn genre_summary_from_row(row: SqliteRow) -> Result<CustomerGenreSummary, RepositoryError> {
    Ok(CustomerGenreSummary {
        genre_name: row.try_get("GenreName")?,
        customer_count: parse_u32("CustomerCount", row.try_get("CustomerCount")?)?,
        purchase_count: parse_u32("PurchaseCount", row.try_get("PurchaseCount")?)?,
        track_count: parse_u32("TrackCount", row.try_get("TrackCount")?)?,
    })
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}
