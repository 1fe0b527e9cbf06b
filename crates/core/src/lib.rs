pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use domain::customer::{Customer, CustomerId, NewCustomer};
pub use domain::report::{CustomerCountrySummary, CustomerGenreSummary, HighSpender};
pub use errors::{ApplicationError, DomainError};
pub use rust_decimal::Decimal;
