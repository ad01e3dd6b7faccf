use std::time::Instant;

use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use patron_core::config::StorageBackend;
use patron_core::domain::customer::{Customer, CustomerId};

use super::{
    format_timestamp, normalized_filter, page_offset, parse_timestamp, record_outcome,
    CustomerRepository, RepositoryError,
};
use crate::DbPool;

const BACKEND: StorageBackend = StorageBackend::Document;

/// Customers stored as JSON documents under generated UUID keys.
pub struct SqlDocumentCustomerRepository {
    pool: DbPool,
}

impl SqlDocumentCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let key = parse_document_id(id)?;
        let row = sqlx::query("SELECT id, document FROM customer_documents WHERE id = ?")
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_cpf(&self, cpf: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, document FROM customer_documents
             WHERE json_extract(document, '$.cpf') = ?
             ORDER BY json_extract(document, '$.created_at'), rowid
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

    async fn fetch_page(
        &self,
        name_filter: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Customer>, u64), RepositoryError> {
        let filter = normalized_filter(name_filter);
        let offset = i64::try_from(page_offset(page, limit))
            .map_err(|e| RepositoryError::Decode(format!("page offset: {e}")))?;

        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, document FROM customer_documents
             WHERE ? IS NULL OR instr(json_extract(document, '$.name_key'), ?) > 0
             ORDER BY json_extract(document, '$.created_at'), rowid
             LIMIT ? OFFSET ?",
        )
        .bind(filter.as_deref())
        .bind(filter.as_deref())
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customer_documents
             WHERE ? IS NULL OR instr(json_extract(document, '$.name_key'), ?) > 0",
        )
        .bind(filter.as_deref())
        .bind(filter.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let customers = rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()?;
        Ok((customers, total.max(0) as u64))
    }

    async fn insert(&self, customer: &mut Customer) -> Result<(), RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let document = encode_document(customer)?;

        sqlx::query("INSERT INTO customer_documents (id, document) VALUES (?, ?)")
            .bind(&id)
            .bind(&document)
            .execute(&self.pool)
            .await?;

        customer.id = CustomerId(id);
        Ok(())
    }

    async fn replace(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let key = parse_document_id(&customer.id)?;

        // cpf and created_at stay as first written.
        let result = sqlx::query(
            "UPDATE customer_documents
             SET document = json_set(
                 document, '$.name', ?, '$.name_key', ?, '$.email', ?, '$.updated_at', ?
             )
             WHERE id = ?",
        )
        .bind(&customer.name)
        .bind(name_key(&customer.name))
        .bind(&customer.email)
        .bind(format_timestamp(&customer.updated_at))
        .bind(key.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { id: customer.id.to_string() });
        }
        Ok(())
    }

    async fn remove(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let key = parse_document_id(id)?;
        let result = sqlx::query("DELETE FROM customer_documents WHERE id = ?")
            .bind(key.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing { id: id.to_string() });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CustomerDocument {
    name: String,
    /// Lowercased `name`; SQLite `lower()` folds ASCII only.
    #[serde(default)]
    name_key: String,
    email: String,
    cpf: String,
    created_at: String,
    updated_at: String,
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn parse_document_id(id: &CustomerId) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(id.as_str().trim()).map_err(|e| RepositoryError::MalformedId {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn encode_document(customer: &Customer) -> Result<String, RepositoryError> {
    let document = CustomerDocument {
        name: customer.name.clone(),
        name_key: name_key(&customer.name),
        email: customer.email.clone(),
        cpf: customer.cpf.clone(),
        created_at: format_timestamp(&customer.created_at),
        updated_at: format_timestamp(&customer.updated_at),
    };
    serde_json::to_string(&document).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let raw: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document: CustomerDocument = serde_json::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("document {id}: {e}")))?;

    Ok(Customer {
        id: CustomerId(id),
        name: document.name,
        email: document.email,
        cpf: document.cpf,
        created_at: parse_timestamp("created_at", &document.created_at)?,
        updated_at: parse_timestamp("updated_at", &document.updated_at)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlDocumentCustomerRepository {
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
        let result = self.fetch_page(name_filter, page, limit).await;
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
