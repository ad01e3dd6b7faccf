//! Adapts real HTTP requests onto gateway events.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{MatchedPath, Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{error, info};

use crate::bootstrap::Application;
use crate::dispatcher::Dispatcher;
use crate::event::{GatewayEvent, GatewayResponse};
use crate::health;

#[derive(Clone)]
pub struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

pub fn dispatch_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/customers", any(collection))
        .route("/customers/{id}", any(member))
        .route("/auth", post(collection))
        .with_state(HttpState { dispatcher })
}

pub fn router(app: &Application) -> Router {
    dispatch_router(app.dispatcher.clone())
        .merge(health::router(app.config.database.backend, app.db_pool.clone()))
}

pub async fn serve(app: &Application) -> std::io::Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(event_name = "system.http.start", bind_address = %address, "http listener started");

    axum::serve(listener, router(app)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(event_name = "system.http.signal_error", error = %err, "ctrl-c handler failed");
    }
}

async fn collection(
    State(state): State<HttpState>,
    method: Method,
    matched: MatchedPath,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = to_event(method, matched.as_str(), None, query, &headers, body);
    into_http(state.dispatcher.handle(event).await)
}

async fn member(
    State(state): State<HttpState>,
    method: Method,
    matched: MatchedPath,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = to_event(method, matched.as_str(), Some(id), query, &headers, body);
    into_http(state.dispatcher.handle(event).await)
}

fn to_event(
    method: Method,
    resource: &str,
    id: Option<String>,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Bytes,
) -> GatewayEvent {
    let path = match id.as_deref() {
        Some(id) => resource.replace("{id}", id),
        None => resource.to_string(),
    };

    let header_map = headers
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect::<HashMap<_, _>>();

    let (body, is_base64_encoded) = if body.is_empty() {
        (None, false)
    } else {
        match String::from_utf8(body.to_vec()) {
            Ok(text) => (Some(text), false),
            Err(_) => (Some(STANDARD.encode(&body)), true),
        }
    };

    GatewayEvent {
        http_method: method.as_str().to_string(),
        resource: resource.to_string(),
        path,
        headers: Some(header_map),
        path_parameters: id.map(|id| HashMap::from([("id".to_string(), id)])),
        query_string_parameters: (!query.is_empty()).then_some(query),
        body,
        is_base64_encoded,
    }
}

fn into_http(response: GatewayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) =
            (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        {
            headers.insert(name, value);
        }
    }

    (status, headers, response.body).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use patron_core::clock::SystemClock;
    use patron_db::repositories::InMemoryCustomerRepository;

    use super::dispatch_router;
    use crate::dispatcher::Dispatcher;
    use crate::presenter::{CustomerJsonPresenter, CustomerTokenPresenter};
    use crate::token::tests::auth_config;
    use crate::token::JwtTokenIssuer;
    use crate::usecase::CustomerService;

    fn router() -> axum::Router {
        let clock = Arc::new(SystemClock);
        let service =
            Arc::new(CustomerService::new(Arc::new(InMemoryCustomerRepository::new()), clock.clone()));
        let issuer = Arc::new(JwtTokenIssuer::from_config(&auth_config("http-secret"), clock).expect("issuer"));
        dispatch_router(Arc::new(Dispatcher::new(
            service,
            Arc::new(CustomerJsonPresenter),
            Arc::new(CustomerTokenPresenter::new(issuer)),
        )))
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn create_then_fetch_by_path_id() {
        let router = router();

        let (status, created) = send(
            &router,
            Request::builder()
                .method("POST")
                .uri("/customers")
                .body(Body::from(r#"{"name":"Http","email":"http@example.com","cpf":"777"}"#))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().expect("id").to_string();

        let (status, fetched) = send(
            &router,
            Request::builder().uri(format!("/customers/{id}?cpf=other")).body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["cpf"], "777");
    }

    #[tokio::test]
    async fn query_string_drives_listing_and_errors() {
        let router = router();

        let (status, page) = send(
            &router,
            Request::builder().uri("/customers?page=1&limit=5").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["limit"], 5);
        assert_eq!(page["total"], 0);

        let (status, error) = send(
            &router,
            Request::builder().uri("/customers?limit=500").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["message"], "limit must be between 1 and 100");
    }

    #[tokio::test]
    async fn auth_for_unknown_cpf_is_not_found() {
        let router = router();

        let (status, error) = send(
            &router,
            Request::builder()
                .method("POST")
                .uri("/auth")
                .body(Body::from(r#"{"cpf":"00000000191"}"#))
                .expect("request"),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["status"], "Not Found");
    }

    #[tokio::test]
    async fn auth_only_accepts_post() {
        let router = router();

        for method in ["GET", "PUT", "DELETE"] {
            let request =
                Request::builder().method(method).uri("/auth").body(Body::empty()).expect("request");
            let response = router.clone().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
    }
}
