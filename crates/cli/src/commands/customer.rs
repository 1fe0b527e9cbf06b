use chinook_core::validation::validate_new_customer;
use chinook_core::{ApplicationError, Customer, CustomerId};
use chinook_db::CustomerStore;

use crate::commands::CommandOutput;
use crate::CustomerFields;

pub async fn add(
    store: &dyn CustomerStore,
    fields: &CustomerFields,
) -> Result<CommandOutput, ApplicationError> {
    let draft = fields.to_new_customer();
    validate_new_customer(&draft)?;

    let id = store.add(draft).await?;
    Ok(CommandOutput::message(format!("added customer {id}"))
        .with_data(&serde_json::json!({ "id": id })))
}

pub async fn update(
    store: &dyn CustomerStore,
    id: i64,
    fields: &CustomerFields,
) -> Result<CommandOutput, ApplicationError> {
    let id = CustomerId(id);
    let current = store.get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    let merged = fields.merge_into(current.to_new());
    validate_new_customer(&merged)?;

    let customer = merged.into_customer(id);
    store.update(customer.clone()).await?;
    Ok(CommandOutput::message(format!("updated customer {id}"))
        .with_lines(vec![describe(&customer)])
        .with_data(&customer))
}

pub async fn delete(store: &dyn CustomerStore, id: i64) -> Result<CommandOutput, ApplicationError> {
    let id = CustomerId(id);
    store.delete(id).await?;
    Ok(CommandOutput::message(format!("deleted customer {id}"))
        .with_data(&serde_json::json!({ "id": id })))
}

pub async fn search(
    store: &dyn CustomerStore,
    name: &str,
) -> Result<CommandOutput, ApplicationError> {
    let customer = store
        .get_by_name(name)
        .await?
        .ok_or_else(|| ApplicationError::NotFound(format!("customer matching `{name}`")))?;
    Ok(single(customer))
}

pub async fn list(store: &dyn CustomerStore) -> Result<CommandOutput, ApplicationError> {
    let customers = store.get_all().await?;
    Ok(many(customers))
}

pub async fn get_by_id(
    store: &dyn CustomerStore,
    id: i64,
) -> Result<CommandOutput, ApplicationError> {
    let id = CustomerId(id);
    let customer = store.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    Ok(single(customer))
}

pub async fn get_by_email(
    store: &dyn CustomerStore,
    email: &str,
) -> Result<CommandOutput, ApplicationError> {
    let customer = store
        .get_by_email(email)
        .await?
        .ok_or_else(|| ApplicationError::NotFound(format!("customer with email `{email}`")))?;
    Ok(single(customer))
}

pub async fn get_paged(
    store: &dyn CustomerStore,
    limit: u32,
    offset: u32,
) -> Result<CommandOutput, ApplicationError> {
    let customers = store.get_paged(limit, offset).await?;
    Ok(many(customers))
}

/// One-line text form used by every customer listing.
pub fn describe(customer: &Customer) -> String {
    let mut line = format!("#{} {} <{}>", customer.id, customer.full_name(), customer.email);
    for (label, value) in [
        ("phone", &customer.phone),
        ("country", &customer.country),
        ("postal code", &customer.postal_code),
    ] {
        if !value.is_empty() {
            line.push_str(&format!(" | {label}: {value}"));
        }
    }
    line
}

fn not_found(id: CustomerId) -> ApplicationError {
    ApplicationError::NotFound(format!("customer {id}"))
}

fn single(customer: Customer) -> CommandOutput {
    CommandOutput::message(describe(&customer)).with_data(&customer)
}

fn many(customers: Vec<Customer>) -> CommandOutput {
    let lines = customers.iter().map(describe).collect();
    CommandOutput::message(format!("{} customer(s)", customers.len()))
        .with_lines(lines)
        .with_data(&customers)
}
