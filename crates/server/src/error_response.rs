use std::error::Error as StdError;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use patron_core::errors::{ApplicationError, ErrorKind};

use crate::event::GatewayResponse;

pub const UNKNOWN_ERROR_TITLE: &str = "Unknown error";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub title: String,
    pub status: String,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Validation => StatusCode::PRECONDITION_FAILED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    }
}

/// Renders any error as a JSON gateway response. Errors outside the
/// application taxonomy become a 500 titled "Unknown error".
pub fn render_error(error: &(dyn StdError + 'static)) -> GatewayResponse {
    let (status, title) = match error.downcast_ref::<ApplicationError>() {
        Some(known) => (status_for(known.kind()), known.title().to_string()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN_ERROR_TITLE.to_string()),
    };

    let body = ErrorBody {
        title,
        status: status.canonical_reason().unwrap_or_default().to_string(),
        message: error.to_string(),
    };

    match serde_json::to_vec(&body) {
        Ok(bytes) => GatewayResponse::json(status.as_u16(), bytes),
        Err(_) => GatewayResponse::json(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), b"{}".to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use patron_core::errors::{ApplicationError, CUSTOMER_NOT_FOUND_MESSAGE};

    use super::{render_error, ErrorBody, UNKNOWN_ERROR_TITLE};

    fn body_of(response: &crate::event::GatewayResponse) -> ErrorBody {
        serde_json::from_str(&response.body).expect("error body")
    }

    #[test]
    fn each_kind_maps_to_its_status() {
        let cases = [
            (ApplicationError::internal_unexplained(), 500, "Internal Server Error"),
            (ApplicationError::validation("bad email"), 412, "Precondition Failed"),
            (ApplicationError::not_found(CUSTOMER_NOT_FOUND_MESSAGE), 404, "Not Found"),
            (ApplicationError::invalid_input("invalid body"), 400, "Bad Request"),
        ];

        for (error, code, reason) in cases {
            let response = render_error(&error);
            let body = body_of(&response);

            assert_eq!(response.status_code, code);
            assert_eq!(body.status, reason);
            assert_eq!(body.title, error.title());
            assert_eq!(response.headers.get("Content-Type").map(String::as_str), Some("application/json"));
        }
    }

    #[test]
    fn message_carries_wrapped_cause() {
        let error = ApplicationError::internal(io::Error::new(io::ErrorKind::Other, "disk gone"));

        let body = body_of(&render_error(&error));

        assert_eq!(body.title, "internal server error");
        assert_eq!(body.message, "disk gone");
    }

    #[test]
    fn unmapped_errors_are_unknown_500() {
        let error = io::Error::new(io::ErrorKind::BrokenPipe, "socket closed");

        let response = render_error(&error);
        let body = body_of(&response);

        assert_eq!(response.status_code, 500);
        assert_eq!(body.title, UNKNOWN_ERROR_TITLE);
        assert_eq!(body.message, "socket closed");
    }
}
