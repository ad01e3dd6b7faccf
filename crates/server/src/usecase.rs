use std::sync::Arc;

use tracing::{debug, info};

use patron_core::clock::Clock;
use patron_core::domain::customer::{Customer, CustomerPage, ANONYMOUS_CPF};
use patron_core::dto::{
    CreateCustomerInput, DeleteCustomerInput, GetCustomerByCpfInput, GetCustomerInput,
    ListCustomersInput, UpdateCustomerInput,
};
use patron_core::errors::{
    ApplicationError, CUSTOMER_NOT_FOUND_MESSAGE, INVALID_PARAMETER_MESSAGE, NOT_FOUND_MESSAGE,
};
use patron_db::repositories::{CustomerRepository, RepositoryError};

/// Customer use cases. This is the only layer that decides between
/// "not found" and "internal" failures.
pub struct CustomerService {
    repository: Arc<dyn CustomerRepository>,
    clock: Arc<dyn Clock>,
}

impl CustomerService {
    pub fn new(repository: Arc<dyn CustomerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn list(&self, input: ListCustomersInput) -> Result<CustomerPage, ApplicationError> {
        let (customers, total) = self
            .repository
            .find_page(input.name.as_deref(), input.page, input.limit)
            .await
            .map_err(storage_failure)?;

        Ok(CustomerPage { customers, total, page: input.page, limit: input.limit })
    }

    pub async fn create(&self, input: CreateCustomerInput) -> Result<Customer, ApplicationError> {
        let mut customer = Customer::new(input.name, input.email, input.cpf, self.clock.now());
        self.repository.create(&mut customer).await.map_err(storage_failure)?;

        info!(
            event_name = "customer.usecase.created",
            customer_id = %customer.id,
            backend = self.repository.backend().as_str(),
            "customer created"
        );
        Ok(customer)
    }

    pub async fn get(&self, input: GetCustomerInput) -> Result<Customer, ApplicationError> {
        self.repository
            .find_by_id(&input.id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ApplicationError::not_found(NOT_FOUND_MESSAGE))
    }

    pub async fn get_by_cpf(
        &self,
        input: GetCustomerByCpfInput,
    ) -> Result<Customer, ApplicationError> {
        let cpf = match input.cpf.trim() {
            "" => ANONYMOUS_CPF,
            cpf => cpf,
        };

        self.repository
            .find_by_cpf(cpf)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ApplicationError::not_found(CUSTOMER_NOT_FOUND_MESSAGE))
    }

    pub async fn update(&self, input: UpdateCustomerInput) -> Result<Customer, ApplicationError> {
        let mut customer = self.get(GetCustomerInput { id: input.id }).await?;
        customer.update(input.name, input.email, self.clock.now());
        self.repository.update(&customer).await.map_err(storage_failure)?;

        info!(
            event_name = "customer.usecase.updated",
            customer_id = %customer.id,
            backend = self.repository.backend().as_str(),
            "customer updated"
        );
        Ok(customer)
    }

    /// Deletes the customer and returns the record as it was before removal.
    pub async fn delete(&self, input: DeleteCustomerInput) -> Result<Customer, ApplicationError> {
        let customer = self.get(GetCustomerInput { id: input.id }).await?;
        self.repository.delete(&customer.id).await.map_err(storage_failure)?;

        info!(
            event_name = "customer.usecase.deleted",
            customer_id = %customer.id,
            backend = self.repository.backend().as_str(),
            "customer deleted"
        );
        Ok(customer)
    }
}

fn storage_failure(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::MalformedId { id, reason } => {
            debug!(
                event_name = "customer.usecase.malformed_id",
                id = %id,
                reason = %reason,
                "rejected customer id"
            );
            ApplicationError::invalid_input(INVALID_PARAMETER_MESSAGE)
        }
        other => ApplicationError::internal(other),
    }
}
