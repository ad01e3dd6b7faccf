use std::collections::BTreeMap;

use tokio::sync::RwLock;

use patron_core::config::StorageBackend;
use patron_core::domain::customer::{Customer, CustomerId};

use super::{name_matches, normalized_filter, page_offset, CustomerRepository, RepositoryError};

#[derive(Default)]
struct MemoryState {
    last_id: u64,
    customers: BTreeMap<u64, Customer>,
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.state.read().await.customers.len()
    }
}

fn parse_memory_id(id: &CustomerId) -> Result<u64, RepositoryError> {
    match id.as_str().trim().parse::<u64>() {
        Ok(key) if key > 0 => Ok(key),
        Ok(_) => Err(RepositoryError::MalformedId {
            id: id.to_string(),
            reason: "record ids start at 1".to_string(),
        }),
        Err(e) => Err(RepositoryError::MalformedId { id: id.to_string(), reason: e.to_string() }),
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let key = parse_memory_id(id)?;
        let state = self.state.read().await;
        Ok(state.customers.get(&key).cloned())
    }

    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.customers.values().find(|customer| customer.cpf == cpf).cloned())
    }

    async fn find_page(
        &self,
        name_filter: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Customer>, u64), RepositoryError> {
        let filter = normalized_filter(name_filter);
        let state = self.state.read().await;
        let matching: Vec<&Customer> = state
            .customers
            .values()
            .filter(|customer| name_matches(&customer.name, filter.as_deref()))
            .collect();

        let skip = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let customers =
            matching.iter().skip(skip).take(limit as usize).map(|&customer| customer.clone()).collect();

        Ok((customers, matching.len() as u64))
    }

    async fn create(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let key = state.last_id;
        customer.id = CustomerId(key.to_string());
        state.customers.insert(key, customer.clone());
        Ok(())
    }

    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let key = parse_memory_id(&customer.id)?;
        let mut state = self.state.write().await;
        match state.customers.get_mut(&key) {
            Some(stored) => {
                stored.name = customer.name.clone();
                stored.email = customer.email.clone();
                stored.updated_at = customer.updated_at;
                Ok(())
            }
            None => Err(RepositoryError::Missing { id: customer.id.to_string() }),
        }
    }

    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let key = parse_memory_id(id)?;
        let mut state = self.state.write().await;
        match state.customers.remove(&key) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::Missing { id: id.to_string() }),
        }
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
