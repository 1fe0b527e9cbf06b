use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use chinook_core::domain::customer::{Customer, CustomerId, NewCustomer};
use chinook_core::domain::report::{CustomerCountrySummary, CustomerGenreSummary, HighSpender};
use chinook_core::validation::require_names;

use super::{count_to_u32, CustomerStore, RepositoryError};
use crate::fixtures::InvoiceFixture;

/// Keeps customers in id order, which doubles as its storage order. Ids are
/// never reused, matching `AUTOINCREMENT`.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    customers: BTreeMap<CustomerId, Customer>,
    last_id: i64,
    invoices: Vec<InvoiceFixture>,
}

impl InMemoryCustomerRepository {
    /// Records a sale so the reporting queries have something to aggregate.
    pub async fn record_invoice(&self, invoice: InvoiceFixture) {
        let mut state = self.state.write().await;
        state.invoices.push(invoice);
    }
}

#[async_trait::async_trait]
impl CustomerStore for InMemoryCustomerRepository {
    async fn get_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.customers.values().cloned().collect())
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.customers.get(&id).cloned())
    }

    async fn get_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .find(|customer| customer.name_contains_lowercase(&needle))
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.customers.values().find(|customer| customer.email == email).cloned())
    }

    async fn add(&self, customer: NewCustomer) -> Result<CustomerId, RepositoryError> {
        require_names(&customer.first_name, &customer.last_name)?;

        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = CustomerId(state.last_id);
        state.customers.insert(id, customer.into_customer(id));
        Ok(id)
    }

    async fn update(&self, customer: Customer) -> Result<(), RepositoryError> {
        require_names(&customer.first_name, &customer.last_name)?;

        let mut state = self.state.write().await;
        match state.customers.get_mut(&customer.id) {
            Some(stored) => {
                *stored = customer;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(customer.id)),
        }
    }

    async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.customers.remove(&id);
        Ok(())
    }

    async fn get_paged(&self, limit: u32, offset: u32) -> Result<Vec<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_count_by_country_descending(
        &self,
    ) -> Result<Vec<CustomerCountrySummary>, RepositoryError> {
        let state = self.state.read().await;

        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for customer in state.customers.values() {
            *counts.entry(customer.country.as_str()).or_default() += 1;
        }

        let mut summaries: Vec<CustomerCountrySummary> = counts
            .into_iter()
            .map(|(country, customer_count)| CustomerCountrySummary {
                country: country.to_string(),
                customer_count,
            })
            .collect();
        summaries.sort_by(|left, right| right.customer_count.cmp(&left.customer_count));
        Ok(summaries)
    }

    async fn get_high_spenders_descending(&self) -> Result<Vec<HighSpender>, RepositoryError> {
        let state = self.state.read().await;

        let mut totals: BTreeMap<CustomerId, Decimal> = BTreeMap::new();
        for invoice in &state.invoices {
            if state.customers.contains_key(&invoice.customer_id) {
                *totals.entry(invoice.customer_id).or_default() += invoice.total;
            }
        }

        let mut spenders: Vec<HighSpender> = totals
            .into_iter()
            .filter_map(|(id, total)| {
                state.customers.get(&id).map(|customer| HighSpender {
                    customer: customer.clone(),
                    total_spent: total.round_dp(2),
                })
            })
            .collect();
        spenders.sort_by(|left, right| right.total_spent.cmp(&left.total_spent));
        Ok(spenders)
    }

    async fn get_most_popular_genres_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerGenreSummary>, RepositoryError> {
        let state = self.state.read().await;

        // genre -> (track lines, invoice indexes)
        let mut tallies: HashMap<&str, (u32, BTreeSet<usize>)> = HashMap::new();
        for (index, invoice) in state.invoices.iter().enumerate() {
            if invoice.customer_id != customer_id {
                continue;
            }
            for genre in &invoice.track_genres {
                let tally = tallies.entry(genre.as_str()).or_default();
                tally.0 += 1;
                tally.1.insert(index);
            }
        }

        let Some(max_tracks) = tallies.values().map(|(tracks, _)| *tracks).max() else {
            return Ok(Vec::new());
        };

        tallies
            .into_iter()
            .filter(|(_, (tracks, _))| *tracks == max_tracks)
            .map(|(genre, (tracks, invoices))| {
                Ok(CustomerGenreSummary {
                    genre_name: genre.to_string(),
                    customer_count: 1,
                    purchase_count: count_to_u32("PurchaseCount", invoices.len())?,
                    track_count: tracks,
                })
            })
            .collect()
    }
}
