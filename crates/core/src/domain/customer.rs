use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CPF looked up when a caller asks for a customer without providing one.
///
/// Anonymous orders resolve to the record stored under this national ID.
pub const ANONYMOUS_CPF: &str = "000.000.000-00";

/// Backend-assigned customer identifier.
///
/// Opaque at the use-case boundary; each storage adapter parses it into its
/// own key type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Builds a customer that has not been persisted yet. The id stays
    /// unassigned until a repository stores it.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        cpf: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CustomerId::default(),
            name: name.into(),
            email: email.into(),
            cpf: cpf.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a profile change. The CPF, id and creation time never change
    /// after the record is created.
    pub fn update(&mut self, name: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) {
        self.name = name.into();
        self.email = email.into();
        self.updated_at = now;
    }
}

/// One offset page of customers plus the total number of matching records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Customer, CustomerId};

    #[test]
    fn update_keeps_identity_and_creation_time() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid instant");
        let mut customer = Customer::new("Ana", "ana@example.com", "123.456.789-09", created);
        customer.id = CustomerId::new("42");

        let later = created + Duration::minutes(5);
        customer.update("Ana Maria", "ana.maria@example.com", later);

        assert_eq!(customer.id, CustomerId::new("42"));
        assert_eq!(customer.cpf, "123.456.789-09");
        assert_eq!(customer.created_at, created);
        assert_eq!(customer.updated_at, later);
        assert_eq!(customer.name, "Ana Maria");
        assert_eq!(customer.email, "ana.maria@example.com");
    }

    #[test]
    fn new_customer_is_unassigned_with_matching_timestamps() {
        let now = Utc::now();
        let customer = Customer::new("Bruno", "bruno@example.com", "98765432100", now);

        assert!(customer.id.is_unassigned());
        assert_eq!(customer.created_at, customer.updated_at);
    }

    #[test]
    fn customer_id_serializes_as_plain_string() {
        let encoded = serde_json::to_string(&CustomerId::new("abc")).expect("serialize id");
        assert_eq!(encoded, "\"abc\"");
    }
}
