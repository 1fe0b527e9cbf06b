use async_trait::async_trait;
use thiserror::Error;

use chinook_core::domain::customer::{Customer, CustomerId, NewCustomer};
use chinook_core::domain::report::{CustomerCountrySummary, CustomerGenreSummary, HighSpender};
use chinook_core::errors::{ApplicationError, DomainError};

pub mod customer;
pub mod memory;

pub use customer::SqlCustomerRepository;
pub use memory::InMemoryCustomerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("customer {0} was not found")]
    NotFound(CustomerId),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Validation(error) => Self::Domain(error),
            RepositoryError::NotFound(id) => Self::NotFound(format!("customer {id}")),
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::Persistence(message),
        }
    }
}

/// Customer persistence plus the read-only reporting queries.
///
/// Lookups return `None` when nothing matches. Orderings that are not stated
/// below are whatever the backing store yields and must not be relied on.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Customer>, RepositoryError>;

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Case-insensitive substring match on first or last name. When several
    /// customers match, which one is returned is unspecified.
    async fn get_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError>;

    /// Stores a new customer and returns the id the store assigned.
    async fn add(&self, customer: NewCustomer) -> Result<CustomerId, RepositoryError>;

    /// Replaces every mutable field of the customer with the same id.
    async fn update(&self, customer: Customer) -> Result<(), RepositoryError>;

    /// Removing an id that does not exist succeeds.
    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError>;

    /// Customers ordered by id, skipping `offset` and returning at most
    /// `limit`. Callers guarantee `limit > 0`.
    async fn get_paged(&self, limit: u32, offset: u32) -> Result<Vec<Customer>, RepositoryError>;

    /// Customer counts per country, largest first. Equal counts come back in
    /// no particular order.
    async fn get_count_by_country_descending(
        &self,
    ) -> Result<Vec<CustomerCountrySummary>, RepositoryError>;

    /// Invoice totals per customer, largest first. Customers without invoices
    /// are left out.
    async fn get_high_spenders_descending(&self) -> Result<Vec<HighSpender>, RepositoryError>;

    /// Every genre tied for the highest track count in the customer's
    /// purchases; empty when the customer bought nothing.
    async fn get_most_popular_genres_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerGenreSummary>, RepositoryError>;
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn count_to_u32(column: &str, count: usize) -> Result<u32, RepositoryError> {
    u32::try_from(count).map_err(|_| {
        RepositoryError::Decode(format!("count for `{column}` does not fit in u32: {count}"))
    })
}
