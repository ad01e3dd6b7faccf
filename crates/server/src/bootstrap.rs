use std::sync::Arc;

use patron_core::clock::{Clock, SystemClock};
use patron_core::config::{AppConfig, ConfigError, LoadOptions, StorageBackend};
use patron_db::repositories::{
    CustomerRepository, InMemoryCustomerRepository, SqlDocumentCustomerRepository,
    SqlKeyedCustomerRepository,
};
use patron_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::dispatcher::Dispatcher;
use crate::presenter::{CustomerJsonPresenter, CustomerTokenPresenter};
use crate::token::{JwtTokenIssuer, TokenError};
use crate::usecase::CustomerService;

/// Everything the transports need, built once at startup.
pub struct Application {
    pub config: AppConfig,
    /// `None` for the in-memory backend.
    pub db_pool: Option<DbPool>,
    pub repository: Arc<dyn CustomerRepository>,
    pub token_issuer: Arc<JwtTokenIssuer>,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("token issuer setup failed: {0}")]
    TokenIssuer(#[source] TokenError),
    #[error("`{0}` backend needs a database pool")]
    MissingPool(StorageBackend),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        backend = config.database.backend.as_str(),
        environment = config.environment.as_str(),
        "starting application bootstrap"
    );

    let db_pool = if config.database.backend.uses_database() {
        let pool =
            connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
        info!(event_name = "system.bootstrap.database_connected", "database connection established");

        migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
        info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");
        Some(pool)
    } else {
        None
    };

    let repository = build_repository(config.database.backend, db_pool.clone())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let token_issuer = Arc::new(
        JwtTokenIssuer::from_config(&config.auth, clock.clone())
            .map_err(BootstrapError::TokenIssuer)?,
    );

    let service = Arc::new(CustomerService::new(repository.clone(), clock));
    let dispatcher = Arc::new(Dispatcher::new(
        service,
        Arc::new(CustomerJsonPresenter),
        Arc::new(CustomerTokenPresenter::new(token_issuer.clone())),
    ));

    info!(
        event_name = "system.bootstrap.ready",
        backend = repository.backend().as_str(),
        "customer dispatcher assembled"
    );

    Ok(Application { config, db_pool, repository, token_issuer, dispatcher })
}

/// Picks the adapter for `backend`. The memory backend ignores any pool.
pub fn build_repository(
    backend: StorageBackend,
    db_pool: Option<DbPool>,
) -> Result<Arc<dyn CustomerRepository>, BootstrapError> {
    match (backend, db_pool) {
        (StorageBackend::Document, Some(pool)) => {
            Ok(Arc::new(SqlDocumentCustomerRepository::new(pool)))
        }
        (StorageBackend::Keyed, Some(pool)) => Ok(Arc::new(SqlKeyedCustomerRepository::new(pool))),
        (StorageBackend::Memory, _) => Ok(Arc::new(InMemoryCustomerRepository::new())),
        (StorageBackend::Document | StorageBackend::Keyed, None) => {
            Err(BootstrapError::MissingPool(backend))
        }
    }
}
