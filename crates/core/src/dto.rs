//! Use-case inputs built by the inbound adapters.

use crate::domain::customer::CustomerId;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCustomersInput {
    pub name: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ListCustomersInput {
    fn default() -> Self {
        Self { name: None, page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateCustomerInput {
    pub name: String,
    pub email: String,
    pub cpf: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetCustomerInput {
    pub id: CustomerId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetCustomerByCpfInput {
    pub cpf: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateCustomerInput {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteCustomerInput {
    pub id: CustomerId,
}
