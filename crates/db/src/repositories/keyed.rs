use std::time::Instant;

use sqlx::Row;
use tracing::debug;

use patron_core::config::StorageBackend;
use patron_core::domain::customer::{Customer, CustomerId};

use super::{
    format_timestamp, name_matches, normalized_filter, page_offset, parse_timestamp, record_outcome,
    CustomerRepository, RepositoryError,
};
use crate::DbPool;

const BACKEND: StorageBackend = StorageBackend::Keyed;

/// Customers stored as flat rows under sequential integer keys.
///
/// Keys are computed by the adapter (`MAX(id) + 1`) and inserted
/// conditionally, so two concurrent creates race to a `Conflict` rather than
/// overwriting each other. Listing scans every matching row and slices the
/// page in memory.
pub struct SqlKeyedCustomerRepository {
    pool: DbPool,
}

impl SqlKeyedCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let key = parse_record_id(id)?;
        let row = sqlx::query(
            "SELECT id, cpf, name, email, created_at, updated_at
             FROM customer_records WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_cpf(&self, cpf: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, cpf, name, email, created_at, updated_at
             FROM customer_records
             WHERE cpf = ?
             ORDER BY id ASC
             LIMIT 1",
        )
        .bind(cpf)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn scan_page(
        &self,
        name_filter: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Customer>, u64), RepositoryError> {
        let filter = normalized_filter(name_filter);
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, cpf, name, email, created_at, updated_at
             FROM customer_records
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        // SQLite lower() folds ASCII only, so names are matched here.
        let matching = rows
            .iter()
            .map(row_to_customer)
            .filter(|customer| match customer {
                Ok(customer) => name_matches(&customer.name, filter.as_deref()),
                Err(_) => true,
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scanned = rows.len() as u64;
        debug!(
            event_name = "storage.keyed.find_page",
            scanned,
            matched = matching.len() as u64,
            page,
            limit,
            "full scan used for keyed customer listing"
        );

        let total = matching.len() as u64;
        let skip = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let customers = matching.into_iter().skip(skip).take(limit as usize).collect();

        Ok((customers, total))
    }

    async fn insert(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        let next_id: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM customer_records")
                .fetch_one(&self.pool)
                .await?;

        let result = sqlx::query(
            "INSERT INTO customer_records (id, cpf, name, email, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(next_id)
        .bind(&customer.cpf)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(format_timestamp(&customer.created_at))
        .bind(format_timestamp(&customer.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict { id: next_id.to_string() });
        }

        customer.id = CustomerId(next_id.to_string());
        Ok(())
    }

    async fn replace(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let key = parse_record_id(&customer.id)?;
        let result = sqlx::query(
            "UPDATE customer_records
             SET name = ?, email = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(format_timestamp(&customer.updated_at))
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { id: customer.id.to_string() });
        }
        Ok(())
    }

    async fn remove(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let key = parse_record_id(id)?;
        let result = sqlx::query("DELETE FROM customer_records WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { id: id.to_string() });
        }
        Ok(())
    }
}

fn parse_record_id(id: &CustomerId) -> Result<i64, RepositoryError> {
    let key = id.as_str().trim().parse::<i64>().map_err(|e| RepositoryError::MalformedId {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    if key <= 0 {
        return Err(RepositoryError::MalformedId {
            id: id.to_string(),
            reason: "record ids start at 1".to_string(),
        });
    }
    Ok(key)
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cpf: String = row.try_get("cpf").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Customer {
        id: CustomerId(id.to_string()),
        name,
        email,
        cpf,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlKeyedCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let started = Instant::now();
        let result = self.fetch_by_id(id).await;
        record_outcome(BACKEND, "find_by_id", started, &result);
        result
    }

    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<Customer>, RepositoryError> {
        let started = Instant::now();
        let result = self.fetch_by_cpf(cpf).await;
        record_outcome(BACKEND, "find_by_cpf", started, &result);
        result
    }

    async fn find_page(
        &self,
        name_filter: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Customer>, u64), RepositoryError> {
        let started = Instant::now();
        let result = self.scan_page(name_filter, page, limit).await;
        record_outcome(BACKEND, "find_page", started, &result);
        result
    }

    async fn create(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        let started = Instant::now();
        let result = self.insert(customer).await;
        record_outcome(BACKEND, "create", started, &result);
        result
    }

    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let started = Instant::now();
        let result = self.replace(customer).await;
        record_outcome(BACKEND, "update", started, &result);
        result
    }

    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let started = Instant::now();
        let result = self.remove(id).await;
        record_outcome(BACKEND, "delete", started, &result);
        result
    }

    fn backend(&self) -> StorageBackend {
        BACKEND
    }
}
