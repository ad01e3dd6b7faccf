use chrono::{DateTime, Utc};

use patron_core::domain::customer::{Customer, ANONYMOUS_CPF};

use crate::repositories::{CustomerRepository, RepositoryError};

struct SampleCustomer {
    name: &'static str,
    email: &'static str,
    cpf: &'static str,
}

/// Deterministic customers used by local runs and end-to-end checks.
///
/// The anonymous record backs token requests that arrive without a CPF.
const SAMPLE_CUSTOMERS: &[SampleCustomer] = &[
    SampleCustomer { name: "Anonymous", email: "anonymous@example.com", cpf: ANONYMOUS_CPF },
    SampleCustomer { name: "Test User", email: "test@example.com", cpf: "12345678900" },
    SampleCustomer { name: "John Doe", email: "john.doe@example.com", cpf: "123.456.789-01" },
    SampleCustomer { name: "José da Silva", email: "jose.silva@example.com", cpf: "987.654.321-09" },
];

pub struct SampleCustomerDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

impl SampleCustomerDataset {
    pub fn cpfs() -> impl Iterator<Item = &'static str> {
        SAMPLE_CUSTOMERS.iter().map(|sample| sample.cpf)
    }

    /// Inserts every sample customer whose CPF is not stored yet.
    pub async fn load(
        repository: &dyn CustomerRepository,
        now: DateTime<Utc>,
    ) -> Result<SeedResult, RepositoryError> {
        let mut result = SeedResult { inserted: Vec::new(), skipped: Vec::new() };

        for sample in SAMPLE_CUSTOMERS {
            if repository.find_by_cpf(sample.cpf).await?.is_some() {
                result.skipped.push(sample.cpf.to_string());
                continue;
            }

            let mut customer = Customer::new(sample.name, sample.email, sample.cpf, now);
            repository.create(&mut customer).await?;
            result.inserted.push(sample.cpf.to_string());
        }

        Ok(result)
    }

    /// Returns the CPFs of sample customers that are not present.
    pub async fn missing(
        repository: &dyn CustomerRepository,
    ) -> Result<Vec<&'static str>, RepositoryError> {
        let mut missing = Vec::new();
        for sample in SAMPLE_CUSTOMERS {
            if repository.find_by_cpf(sample.cpf).await?.is_none() {
                missing.push(sample.cpf);
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use patron_core::domain::customer::ANONYMOUS_CPF;

    use super::SampleCustomerDataset;
    use crate::repositories::{
        CustomerRepository, InMemoryCustomerRepository, SqlKeyedCustomerRepository,
    };
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn load_is_idempotent_on_cpf() {
        let repo = InMemoryCustomerRepository::new();

        let first = SampleCustomerDataset::load(&repo, Utc::now()).await.expect("first load");
        let second = SampleCustomerDataset::load(&repo, Utc::now()).await.expect("second load");

        assert_eq!(first.inserted.len(), SampleCustomerDataset::cpfs().count());
        assert!(first.skipped.is_empty());
        assert!(second.inserted.is_empty());
        assert_eq!(second.skipped, first.inserted);
        assert_eq!(repo.len().await, first.inserted.len());
    }

    #[tokio::test]
    async fn seeded_keyed_store_resolves_anonymous_cpf() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlKeyedCustomerRepository::new(pool);

        assert_eq!(
            SampleCustomerDataset::missing(&repo).await.expect("missing").len(),
            SampleCustomerDataset::cpfs().count()
        );
        SampleCustomerDataset::load(&repo, Utc::now()).await.expect("load");

        let anonymous = repo.find_by_cpf(ANONYMOUS_CPF).await.expect("lookup");
        assert_eq!(anonymous.map(|c| c.name), Some("Anonymous".to_string()));
        assert!(SampleCustomerDataset::missing(&repo).await.expect("missing").is_empty());
    }
}
