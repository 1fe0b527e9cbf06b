pub mod customer;
pub mod report;
