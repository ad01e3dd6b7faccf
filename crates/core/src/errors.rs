use std::error::Error as StdError;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub const NOT_FOUND_MESSAGE: &str = "data not found";
pub const CUSTOMER_NOT_FOUND_MESSAGE: &str = "customer not found";
pub const INTERNAL_MESSAGE: &str = "internal server error";
pub const VALIDATION_MESSAGE: &str = "validation error";
pub const INVALID_BODY_MESSAGE: &str = "invalid body";
pub const INVALID_PARAMETER_MESSAGE: &str = "invalid parameter";
pub const METHOD_NOT_SUPPORTED_MESSAGE: &str = "method not supported";

/// The four failure kinds that cross the use-case boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Internal,
    InvalidInput,
}

/// Failure returned by use cases and request adapters.
///
/// `message` is the short label; a wrapped cause, when present, supplies the
/// displayed text. Causes are type-erased so no storage detail leaks out.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{}", describe(.message, .source.as_deref()))]
    Validation { message: String, source: Option<BoxError> },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{}", describe(.message, .source.as_deref()))]
    Internal { message: String, source: Option<BoxError> },
    #[error("{message}")]
    InvalidInput { message: String },
}

fn describe(message: &str, source: Option<&(dyn StdError + Send + Sync + 'static)>) -> String {
    match source {
        Some(source) => source.to_string(),
        None => message.to_string(),
    }
}

impl ApplicationError {
    pub fn validation(source: impl Into<BoxError>) -> Self {
        Self::Validation { message: VALIDATION_MESSAGE.to_string(), source: Some(source.into()) }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::Internal { message: INTERNAL_MESSAGE.to_string(), source: Some(source.into()) }
    }

    /// Internal failure without a cause, for paths that have nothing to wrap.
    pub fn internal_unexplained() -> Self {
        Self::Internal { message: INTERNAL_MESSAGE.to_string(), source: None }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Short label rendered as the error title.
    pub fn title(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::NotFound { message }
            | Self::Internal { message, .. }
            | Self::InvalidInput { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::{ApplicationError, ErrorKind, INTERNAL_MESSAGE, VALIDATION_MESSAGE};

    #[test]
    fn internal_error_displays_wrapped_cause() {
        let error = ApplicationError::internal(io::Error::new(io::ErrorKind::Other, "disk gone"));

        assert_eq!(error.kind(), ErrorKind::Internal);
        assert_eq!(error.title(), INTERNAL_MESSAGE);
        assert_eq!(error.to_string(), "disk gone");
        assert!(error.source().is_some());
    }

    #[test]
    fn internal_error_without_cause_displays_label() {
        let error = ApplicationError::internal_unexplained();

        assert_eq!(error.to_string(), INTERNAL_MESSAGE);
        assert!(error.source().is_none());
    }

    #[test]
    fn validation_error_keeps_fixed_title() {
        let error = ApplicationError::validation("email is malformed");

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.title(), VALIDATION_MESSAGE);
        assert_eq!(error.to_string(), "email is malformed");
    }

    #[test]
    fn not_found_and_invalid_input_use_message_as_title_and_text() {
        let not_found = ApplicationError::not_found("customer not found");
        let invalid = ApplicationError::invalid_input("invalid body");

        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.title(), "customer not found");
        assert_eq!(not_found.to_string(), "customer not found");
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
        assert_eq!(invalid.title(), "invalid body");
    }
}
