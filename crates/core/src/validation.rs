//! Input checks applied before a customer reaches the repository.
//!
//! Column widths mirror the `Customer` table definition; SQLite does not
//! enforce `VARCHAR(n)` so the limits are checked here.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::customer::NewCustomer;
use crate::errors::DomainError;

pub const FIRST_NAME_MAX: usize = 40;
pub const LAST_NAME_MAX: usize = 20;
pub const EMAIL_MAX: usize = 60;
pub const PHONE_MAX: usize = 24;
pub const COUNTRY_MAX: usize = 40;
pub const POSTAL_CODE_MAX: usize = 10;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(
            r#"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$"#,
        )
        .expect("valid email regex")
    })
}

/// Addr-spec check in the spirit of RFC 5322: no display names, comments or
/// quoted local parts.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, _domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    email_regex().is_match(email)
}

/// The persisted-row invariant: both names are non-blank.
pub fn require_names(first_name: &str, last_name: &str) -> Result<(), DomainError> {
    if first_name.trim().is_empty() {
        return Err(DomainError::MissingField { field: "first_name" });
    }
    if last_name.trim().is_empty() {
        return Err(DomainError::MissingField { field: "last_name" });
    }
    Ok(())
}

pub fn validate_new_customer(customer: &NewCustomer) -> Result<(), DomainError> {
    require_names(&customer.first_name, &customer.last_name)?;

    if customer.email.trim().is_empty() {
        return Err(DomainError::MissingField { field: "email" });
    }
    if !is_valid_email(&customer.email) {
        return Err(DomainError::InvalidEmail(customer.email.clone()));
    }

    check_width("first_name", &customer.first_name, FIRST_NAME_MAX)?;
    check_width("last_name", &customer.last_name, LAST_NAME_MAX)?;
    check_width("email", &customer.email, EMAIL_MAX)?;
    check_width("phone", &customer.phone, PHONE_MAX)?;
    check_width("country", &customer.country, COUNTRY_MAX)?;
    check_width("postal_code", &customer.postal_code, POSTAL_CODE_MAX)?;

    Ok(())
}

fn check_width(field: &'static str, value: &str, max: usize) -> Result<(), DomainError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(DomainError::FieldTooLong { field, max, actual });
    }
    Ok(())
}
