use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, error};

use patron_core::config::StorageBackend;
use patron_core::domain::customer::{Customer, CustomerId};

pub mod document;
pub mod keyed;
pub mod memory;

pub use document::SqlDocumentCustomerRepository;
pub use keyed::SqlKeyedCustomerRepository;
pub use memory::InMemoryCustomerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("malformed customer id `{id}`: {reason}")]
    MalformedId { id: String, reason: String },
    #[error("customer `{id}` does not exist")]
    Missing { id: String },
    #[error("customer `{id}` already exists")]
    Conflict { id: String },
}

/// Storage facade shared by every customer backend.
///
/// `Ok(None)` means the record is absent. Errors are reserved for storage
/// failures and for identifiers the backend cannot parse.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<Customer>, RepositoryError>;

    /// Returns one page plus the total number of matching records.
    ///
    /// `page` is 1-based. A `name_filter` matches case-insensitive substrings.
    async fn find_page(
        &self,
        name_filter: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Customer>, u64), RepositoryError>;

    /// Inserts the customer and writes the assigned id back into it.
    async fn create(&self, customer: &mut Customer) -> Result<(), RepositoryError>;

    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError>;

    fn backend(&self) -> StorageBackend;
}

pub(crate) fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}

pub(crate) fn normalized_filter(name_filter: Option<&str>) -> Option<String> {
    name_filter.map(str::trim).filter(|name| !name.is_empty()).map(str::to_lowercase)
}

/// Unicode case-insensitive substring match against an already normalized filter.
pub(crate) fn name_matches(name: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(needle) => name.to_lowercase().contains(needle),
        None => true,
    }
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}

pub(crate) fn record_outcome<T>(
    backend: StorageBackend,
    operation: &'static str,
    started: Instant,
    result: &Result<T, RepositoryError>,
) {
    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => debug!(
            event_name = "storage.operation.completed",
            backend = backend.as_str(),
            operation,
            duration_ms,
            "storage operation completed"
        ),
        Err(err) => error!(
            event_name = "storage.operation.failed",
            backend = backend.as_str(),
            operation,
            duration_ms,
            error = %err,
            "storage operation failed"
        ),
    }
}
