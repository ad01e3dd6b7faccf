use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use patron_core::domain::customer::{Customer, CustomerPage};
use patron_core::errors::ApplicationError;

use crate::token::TokenIssuer;

/// Use-case outcome handed to a presenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenterInput {
    Customer(Customer),
    Page(CustomerPage),
    Empty,
}

pub trait Presenter: Send + Sync {
    fn present(&self, input: PresenterInput) -> Result<Vec<u8>, ApplicationError>;
}

#[derive(Debug, Serialize)]
struct CustomerView<'a> {
    id: &'a str,
    name: &'a str,
    email: &'a str,
    cpf: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Customer> for CustomerView<'a> {
    fn from(customer: &'a Customer) -> Self {
        Self {
            id: customer.id.as_str(),
            name: &customer.name,
            email: &customer.email,
            cpf: &customer.cpf,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct CustomerPageView<'a> {
    customers: Vec<CustomerView<'a>>,
    total: u64,
    page: u32,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct EmptyView {}

/// Plain JSON rendering of customers and customer pages.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomerJsonPresenter;

impl Presenter for CustomerJsonPresenter {
    fn present(&self, input: PresenterInput) -> Result<Vec<u8>, ApplicationError> {
        let encoded = match input {
            PresenterInput::Customer(ref customer) => {
                serde_json::to_vec(&CustomerView::from(customer))
            }
            PresenterInput::Page(ref page) => serde_json::to_vec(&CustomerPageView {
                customers: page.customers.iter().map(CustomerView::from).collect(),
                total: page.total,
                page: page.page,
                limit: page.limit,
            }),
            PresenterInput::Empty => serde_json::to_vec(&EmptyView {}),
        };

        encoded.map_err(ApplicationError::internal)
    }
}

#[derive(Debug, Serialize)]
struct TokenView {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

/// Issues a bearer token for a single customer and renders the envelope.
pub struct CustomerTokenPresenter {
    issuer: Arc<dyn TokenIssuer>,
}

impl CustomerTokenPresenter {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl Presenter for CustomerTokenPresenter {
    fn present(&self, input: PresenterInput) -> Result<Vec<u8>, ApplicationError> {
        let PresenterInput::Customer(customer) = input else {
            return Err(ApplicationError::internal_unexplained());
        };

        let token =
            self.issuer.generate_token(customer.id.as_str()).map_err(ApplicationError::internal)?;

        serde_json::to_vec(&TokenView {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_at_millis,
        })
        .map_err(ApplicationError::internal)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use patron_core::clock::SystemClock;
    use patron_core::domain::customer::{Customer, CustomerId, CustomerPage};
    use patron_core::errors::ErrorKind;

    use super::{CustomerJsonPresenter, CustomerTokenPresenter, Presenter, PresenterInput};
    use crate::token::tests::auth_config;
    use crate::token::{IssuedToken, JwtTokenIssuer, TokenError, TokenIssuer};

    fn sample() -> Customer {
        let at = Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).single().expect("valid time");
        let mut customer = Customer::new("Test User", "test@example.com", "12345678900", at);
        customer.id = CustomerId::from("17");
        customer
    }

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("valid json")
    }

    struct FailingIssuer;

    impl TokenIssuer for FailingIssuer {
        fn generate_token(&self, _subject: &str) -> Result<IssuedToken, TokenError> {
            Err(TokenError::Lifetime(0))
        }
    }

    #[test]
    fn customer_renders_flat_record() {
        let body = CustomerJsonPresenter.present(PresenterInput::Customer(sample())).expect("json");

        assert_eq!(
            parse(&body),
            json!({
                "id": "17",
                "name": "Test User",
                "email": "test@example.com",
                "cpf": "12345678900",
                "created_at": "2026-02-03T04:05:06Z",
                "updated_at": "2026-02-03T04:05:06Z",
            })
        );
    }

    #[test]
    fn page_renders_customers_with_paging_fields() {
        let page = CustomerPage { customers: vec![sample()], total: 3, page: 2, limit: 2 };

        let body = parse(&CustomerJsonPresenter.present(PresenterInput::Page(page)).expect("json"));

        assert_eq!(body["total"], 3);
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["customers"][0]["cpf"], "12345678900");
    }

    #[test]
    fn empty_renders_empty_object() {
        let body = CustomerJsonPresenter.present(PresenterInput::Empty).expect("json");

        assert_eq!(parse(&body), json!({}));
    }

    #[test]
    fn token_presenter_signs_for_customer_id() {
        let issuer = Arc::new(
            JwtTokenIssuer::from_config(&auth_config("presenter-secret"), Arc::new(SystemClock))
                .expect("issuer"),
        );
        let presenter = CustomerTokenPresenter::new(issuer.clone());

        let body = parse(&presenter.present(PresenterInput::Customer(sample())).expect("token"));

        assert_eq!(body["token_type"], "Bearer");
        let token = body["access_token"].as_str().expect("token string");
        let claims = issuer.verify(token).expect("claims");
        assert_eq!(claims.sub, "17");
        assert_eq!(body["expires_in"].as_i64(), Some(claims.exp * 1_000));
    }

    #[test]
    fn token_presenter_rejects_non_customer_input() {
        let presenter = CustomerTokenPresenter::new(Arc::new(FailingIssuer));

        let empty = presenter.present(PresenterInput::Empty).expect_err("empty input");
        let page = presenter
            .present(PresenterInput::Page(CustomerPage {
                customers: Vec::new(),
                total: 0,
                page: 1,
                limit: 10,
            }))
            .expect_err("page input");

        assert_eq!(empty.kind(), ErrorKind::Internal);
        assert_eq!(page.kind(), ErrorKind::Internal);
    }

    #[test]
    fn issuer_failure_is_internal() {
        let presenter = CustomerTokenPresenter::new(Arc::new(FailingIssuer));

        let error = presenter.present(PresenterInput::Customer(sample())).expect_err("issuer");

        assert_eq!(error.kind(), ErrorKind::Internal);
    }
}
