use chinook_core::{ApplicationError, CustomerId};
use chinook_db::CustomerStore;

use crate::commands::CommandOutput;

pub async fn count_by_country(
    store: &dyn CustomerStore,
) -> Result<CommandOutput, ApplicationError> {
    let summaries = store.get_count_by_country_descending().await?;
    let lines = summaries
        .iter()
        .map(|row| {
            let country = if row.country.is_empty() { "(none)" } else { row.country.as_str() };
            format!("{country}: {}", row.customer_count)
        })
        .collect();

    Ok(CommandOutput::message(format!("{} country(ies)", summaries.len()))
        .with_lines(lines)
        .with_data(&summaries))
}

pub async fn high_spenders(store: &dyn CustomerStore) -> Result<CommandOutput, ApplicationError> {
    let spenders = store.get_high_spenders_descending().await?;
    let lines = spenders
        .iter()
        .map(|row| {
            format!("#{} {}: {}", row.customer.id, row.customer.full_name(), row.total_spent)
        })
        .collect();

    Ok(CommandOutput::message(format!("{} customer(s) with invoices", spenders.len()))
        .with_lines(lines)
        .with_data(&spenders))
}

/// Ties are all reported; an empty result is not an error.
pub async fn popular_genres(
    store: &dyn CustomerStore,
    customer_id: i64,
) -> Result<CommandOutput, ApplicationError> {
    let customer_id = CustomerId(customer_id);
    let genres = store.get_most_popular_genres_by_customer(customer_id).await?;
    let lines = genres
        .iter()
        .map(|row| {
            format!(
                "{}: {} track(s) across {} purchase(s)",
                row.genre_name, row.track_count, row.purchase_count
            )
        })
        .collect();

    let message = if genres.is_empty() {
        format!("customer {customer_id} has no purchases")
    } else {
        format!("most popular genre(s) for customer {customer_id}")
    };
    Ok(CommandOutput::message(message).with_lines(lines).with_data(&genres))
}
