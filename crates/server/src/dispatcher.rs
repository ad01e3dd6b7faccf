use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use patron_core::domain::customer::CustomerId;
use patron_core::dto::{
    CreateCustomerInput, DeleteCustomerInput, GetCustomerByCpfInput, GetCustomerInput,
    ListCustomersInput, UpdateCustomerInput, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT,
};
use patron_core::errors::{ApplicationError, INVALID_PARAMETER_MESSAGE, METHOD_NOT_SUPPORTED_MESSAGE};

use crate::error_response::render_error;
use crate::event::{GatewayEvent, GatewayResponse};
use crate::presenter::{Presenter, PresenterInput};
use crate::usecase::CustomerService;

pub const PAGE_MESSAGE: &str = "page must be greater than zero";
pub const LIMIT_MESSAGE: &str = "limit must be between 1 and 100";

const AUTH_RESOURCE_SUFFIX: &str = "/auth";

/// Operation selected for an inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Authenticate,
    Get(CustomerId),
    GetByCpf(String),
    List,
    Create,
    Update(CustomerId),
    Delete(CustomerId),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::Get(_) => "get",
            Self::GetByCpf(_) => "get_by_cpf",
            Self::List => "list",
            Self::Create => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// Maps an event onto a route. The path `id` always wins over a `cpf` query.
pub fn resolve(event: &GatewayEvent) -> Result<Route, ApplicationError> {
    let id = event.path_parameter("id").map(CustomerId::from);

    if event.method_is("POST") && event.resource.trim_end_matches('/').ends_with(AUTH_RESOURCE_SUFFIX)
    {
        return Ok(Route::Authenticate);
    }

    if event.method_is("GET") {
        if let Some(id) = id {
            return Ok(Route::Get(id));
        }
        if let Some(cpf) = event.query_parameter("cpf") {
            return Ok(Route::GetByCpf(cpf.to_string()));
        }
        return Ok(Route::List);
    }

    if event.method_is("POST") {
        return Ok(Route::Create);
    }

    if event.method_is("PUT") {
        return id.map(Route::Update).ok_or_else(missing_id);
    }

    if event.method_is("DELETE") {
        return id.map(Route::Delete).ok_or_else(missing_id);
    }

    Err(ApplicationError::invalid_input(METHOD_NOT_SUPPORTED_MESSAGE))
}

fn missing_id() -> ApplicationError {
    ApplicationError::invalid_input(INVALID_PARAMETER_MESSAGE)
}

pub fn list_input(event: &GatewayEvent) -> Result<ListCustomersInput, ApplicationError> {
    let page = match event.query_parameter("page") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(page) if page > 0 => page,
            _ => return Err(ApplicationError::invalid_input(PAGE_MESSAGE)),
        },
        None => DEFAULT_PAGE,
    };

    let limit = match event.query_parameter("limit") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
            _ => return Err(ApplicationError::invalid_input(LIMIT_MESSAGE)),
        },
        None => DEFAULT_LIMIT,
    };

    let name = event.query_parameter("name").map(str::to_string);
    Ok(ListCustomersInput { name, page, limit })
}

/// Routes gateway events to use cases and renders their outcome.
pub struct Dispatcher {
    service: Arc<CustomerService>,
    records: Arc<dyn Presenter>,
    tokens: Arc<dyn Presenter>,
}

impl Dispatcher {
    pub fn new(
        service: Arc<CustomerService>,
        records: Arc<dyn Presenter>,
        tokens: Arc<dyn Presenter>,
    ) -> Self {
        Self { service, records, tokens }
    }

    pub async fn handle(&self, event: GatewayEvent) -> GatewayResponse {
        let started = Instant::now();
        let outcome = match resolve(&event) {
            Ok(route) => {
                let operation = route.name();
                (operation, self.run(route, &event).await)
            }
            Err(error) => ("unresolved", Err(error)),
        };

        let (operation, result) = outcome;
        let response = match result {
            Ok(body) => GatewayResponse::json(200, body),
            Err(error) => render_error(&error),
        };

        info!(
            event_name = "customer.dispatch.completed",
            method = %event.http_method,
            resource = %event.resource,
            operation,
            status = response.status_code,
            duration_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );
        response
    }

    async fn run(&self, route: Route, event: &GatewayEvent) -> Result<Vec<u8>, ApplicationError> {
        match route {
            Route::Authenticate => {
                let body = event.customer_body()?;
                let customer = self
                    .service
                    .get_by_cpf(GetCustomerByCpfInput { cpf: body.cpf.unwrap_or_default() })
                    .await?;
                self.tokens.present(PresenterInput::Customer(customer))
            }
            Route::Get(id) => {
                let customer = self.service.get(GetCustomerInput { id }).await?;
                self.records.present(PresenterInput::Customer(customer))
            }
            Route::GetByCpf(cpf) => {
                let customer = self.service.get_by_cpf(GetCustomerByCpfInput { cpf }).await?;
                self.records.present(PresenterInput::Customer(customer))
            }
            Route::List => {
                let page = self.service.list(list_input(event)?).await?;
                self.records.present(PresenterInput::Page(page))
            }
            Route::Create => {
                let body = event.customer_body()?;
                let customer = self
                    .service
                    .create(CreateCustomerInput {
                        name: body.name.unwrap_or_default(),
                        email: body.email.unwrap_or_default(),
                        cpf: body.cpf.unwrap_or_default(),
                    })
                    .await?;
                self.records.present(PresenterInput::Customer(customer))
            }
            Route::Update(id) => {
                let body = event.customer_body()?;
                let customer = self
                    .service
                    .update(UpdateCustomerInput {
                        id,
                        name: body.name.unwrap_or_default(),
                        email: body.email.unwrap_or_default(),
                    })
                    .await?;
                self.records.present(PresenterInput::Customer(customer))
            }
            Route::Delete(id) => {
                let customer = self.service.delete(DeleteCustomerInput { id }).await?;
                self.records.present(PresenterInput::Customer(customer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use patron_core::clock::SystemClock;
    use patron_core::domain::customer::{CustomerId, ANONYMOUS_CPF};
    use patron_core::errors::{ErrorKind, METHOD_NOT_SUPPORTED_MESSAGE};
    use patron_db::repositories::InMemoryCustomerRepository;

    use super::{list_input, resolve, Dispatcher, Route, LIMIT_MESSAGE, PAGE_MESSAGE};
    use crate::event::GatewayEvent;
    use crate::presenter::{CustomerJsonPresenter, CustomerTokenPresenter};
    use crate::token::tests::auth_config;
    use crate::token::JwtTokenIssuer;
    use crate::usecase::CustomerService;

    fn dispatcher() -> Dispatcher {
        let clock = Arc::new(SystemClock);
        let service =
            Arc::new(CustomerService::new(Arc::new(InMemoryCustomerRepository::new()), clock.clone()));
        let issuer =
            Arc::new(JwtTokenIssuer::from_config(&auth_config("dispatch-secret"), clock).expect("issuer"));
        Dispatcher::new(
            service,
            Arc::new(CustomerJsonPresenter),
            Arc::new(CustomerTokenPresenter::new(issuer)),
        )
    }

    fn json(body: &str) -> Value {
        serde_json::from_str(body).expect("json body")
    }

    async fn create(dispatcher: &Dispatcher, name: &str, cpf: &str) -> String {
        let response = dispatcher
            .handle(GatewayEvent::new("POST", "/customers").with_body(format!(
                r#"{{"name":"{name}","email":"{}@example.com","cpf":"{cpf}"}}"#,
                name.to_lowercase()
            )))
            .await;
        assert_eq!(response.status_code, 200, "create failed: {}", response.body);
        json(&response.body)["id"].as_str().expect("id").to_string()
    }

    #[test]
    fn get_routes_are_deterministic() {
        let list = GatewayEvent::new("GET", "/customers");
        let by_cpf = GatewayEvent::new("GET", "/customers").with_query_parameter("cpf", "123");
        let by_id = GatewayEvent::new("get", "/customers/{id}")
            .with_path_parameter("id", "5")
            .with_query_parameter("cpf", "123");

        assert_eq!(resolve(&list).expect("list"), Route::List);
        assert_eq!(resolve(&by_cpf).expect("cpf"), Route::GetByCpf("123".to_string()));
        assert_eq!(resolve(&by_id).expect("id"), Route::Get(CustomerId::from("5")));
    }

    #[test]
    fn auth_resource_takes_precedence_for_post() {
        assert_eq!(resolve(&GatewayEvent::new("POST", "/auth")).expect("auth"), Route::Authenticate);
        assert_eq!(
            resolve(&GatewayEvent::new("post", "/v1/customers/auth/")).expect("auth"),
            Route::Authenticate
        );
        assert_eq!(resolve(&GatewayEvent::new("POST", "/customers")).expect("create"), Route::Create);
    }

    #[test]
    fn writes_without_id_and_unknown_methods_are_invalid_input() {
        for method in ["PUT", "DELETE"] {
            let error = resolve(&GatewayEvent::new(method, "/customers")).expect_err("missing id");
            assert_eq!(error.kind(), ErrorKind::InvalidInput);
        }

        let error = resolve(&GatewayEvent::new("PATCH", "/customers")).expect_err("patch");
        assert_eq!(error.title(), METHOD_NOT_SUPPORTED_MESSAGE);
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let defaults = list_input(&GatewayEvent::new("GET", "/customers")).expect("defaults");
        assert_eq!((defaults.page, defaults.limit, defaults.name), (1, 10, None));

        let explicit = list_input(
            &GatewayEvent::new("GET", "/customers")
                .with_query_parameter("page", "3")
                .with_query_parameter("limit", "100")
                .with_query_parameter("name", "silva"),
        )
        .expect("explicit");
        assert_eq!((explicit.page, explicit.limit), (3, 100));
        assert_eq!(explicit.name.as_deref(), Some("silva"));

        for (key, value, message) in [
            ("page", "0", PAGE_MESSAGE),
            ("page", "-1", PAGE_MESSAGE),
            ("limit", "0", LIMIT_MESSAGE),
            ("limit", "101", LIMIT_MESSAGE),
            ("limit", "ten", LIMIT_MESSAGE),
        ] {
            let error = list_input(&GatewayEvent::new("GET", "/customers").with_query_parameter(key, value))
                .expect_err("out of range");
            assert_eq!(error.title(), message);
        }
    }

    #[tokio::test]
    async fn full_lifecycle_over_events() {
        let dispatcher = dispatcher();
        let id = create(&dispatcher, "Maria", "321").await;

        let fetched = dispatcher
            .handle(GatewayEvent::new("GET", "/customers/{id}").with_path_parameter("id", id.as_str()))
            .await;
        assert_eq!(fetched.status_code, 200);
        assert_eq!(json(&fetched.body)["cpf"], "321");
        assert_eq!(fetched.headers.get("Content-Type").map(String::as_str), Some("application/json"));

        let updated = dispatcher
            .handle(
                GatewayEvent::new("PUT", "/customers/{id}")
                    .with_path_parameter("id", id.as_str())
                    .with_body(r#"{"name":"Maria Souza","email":"maria.souza@example.com","cpf":"999"}"#),
            )
            .await;
        assert_eq!(updated.status_code, 200);
        assert_eq!(json(&updated.body)["name"], "Maria Souza");
        assert_eq!(json(&updated.body)["cpf"], "321");

        let deleted = dispatcher
            .handle(GatewayEvent::new("DELETE", "/customers/{id}").with_path_parameter("id", id.as_str()))
            .await;
        assert_eq!(deleted.status_code, 200);
        assert_eq!(json(&deleted.body)["name"], "Maria Souza");

        let gone = dispatcher
            .handle(GatewayEvent::new("GET", "/customers/{id}").with_path_parameter("id", id.as_str()))
            .await;
        assert_eq!(gone.status_code, 404);
        assert_eq!(json(&gone.body)["title"], "data not found");
        assert_eq!(json(&gone.body)["status"], "Not Found");
    }

    #[tokio::test]
    async fn list_pages_over_events() {
        let dispatcher = dispatcher();
        for (name, cpf) in [("Ana", "1"), ("Bruno", "2"), ("Carla", "3")] {
            create(&dispatcher, name, cpf).await;
        }

        let response = dispatcher
            .handle(
                GatewayEvent::new("GET", "/customers")
                    .with_query_parameter("page", "2")
                    .with_query_parameter("limit", "2"),
            )
            .await;

        let body = json(&response.body);
        assert_eq!(response.status_code, 200);
        assert_eq!(body["total"], 3);
        assert_eq!(body["customers"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["customers"][0]["name"], "Carla");
    }

    #[tokio::test]
    async fn auth_issues_token_for_known_cpf_and_404_otherwise() {
        let dispatcher = dispatcher();
        create(&dispatcher, "Anonymous", ANONYMOUS_CPF).await;
        create(&dispatcher, "Test", "12345678900").await;

        let known = dispatcher
            .handle(GatewayEvent::new("POST", "/auth").with_body(r#"{"cpf":"12345678900"}"#))
            .await;
        assert_eq!(known.status_code, 200);
        assert_eq!(json(&known.body)["token_type"], "Bearer");

        let anonymous = dispatcher.handle(GatewayEvent::new("POST", "/auth")).await;
        assert_eq!(anonymous.status_code, 200);

        let unknown = dispatcher
            .handle(GatewayEvent::new("POST", "/auth").with_body(r#"{"cpf":"55555555555"}"#))
            .await;
        assert_eq!(unknown.status_code, 404);
    }

    #[tokio::test]
    async fn malformed_inputs_render_400() {
        let dispatcher = dispatcher();

        let bad_body =
            dispatcher.handle(GatewayEvent::new("POST", "/customers").with_body("not json")).await;
        let bad_id = dispatcher
            .handle(GatewayEvent::new("GET", "/customers/{id}").with_path_parameter("id", "abc"))
            .await;
        let bad_method = dispatcher.handle(GatewayEvent::new("OPTIONS", "/customers")).await;

        assert_eq!(bad_body.status_code, 400);
        assert_eq!(json(&bad_body.body)["title"], "invalid body");
        assert_eq!(bad_id.status_code, 400);
        assert_eq!(bad_method.status_code, 400);
        assert_eq!(json(&bad_method.body)["message"], "method not supported");
    }
}
