pub mod clock;
pub mod config;
pub mod domain;
pub mod dto;
pub mod errors;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::customer::{Customer, CustomerId, CustomerPage, ANONYMOUS_CPF};
pub use errors::{ApplicationError, ErrorKind};
