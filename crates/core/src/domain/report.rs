use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::Customer;

/// One row of the customers-per-country report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCountrySummary {
    pub country: String,
    pub customer_count: u32,
}

/// Genre totals for a single customer's purchase history.
///
/// `track_count` counts invoice lines in the genre and is the ranking key.
/// `purchase_count` counts distinct invoices that contain the genre, and
/// `customer_count` the distinct buyers behind those lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGenreSummary {
    pub genre_name: String,
    pub customer_count: u32,
    pub purchase_count: u32,
    pub track_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSpender {
    pub customer: Customer,
    pub total_spent: Decimal,
}
