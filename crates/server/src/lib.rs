pub mod bootstrap;
pub mod dispatcher;
pub mod error_response;
pub mod event;
pub mod health;
pub mod http;
pub mod presenter;
pub mod token;
pub mod usecase;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use dispatcher::Dispatcher;
pub use event::{GatewayEvent, GatewayResponse};
pub use token::{JwtTokenIssuer, TokenIssuer};
pub use usecase::CustomerService;
