//! API-gateway shaped request and response envelopes.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use patron_core::errors::{ApplicationError, INVALID_BODY_MESSAGE};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub http_method: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Fields accepted by the create, update and auth routes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
}

impl GatewayEvent {
    pub fn new(http_method: impl Into<String>, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self { http_method: http_method.into(), path: resource.clone(), resource, ..Self::default() }
    }

    pub fn with_path_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.path_parameters.get_or_insert_with(HashMap::new).insert(key.to_string(), value.into());
        self
    }

    pub fn with_query_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Non-blank path parameter.
    pub fn path_parameter(&self, key: &str) -> Option<&str> {
        non_blank(self.path_parameters.as_ref(), key)
    }

    /// Non-blank query-string parameter.
    pub fn query_parameter(&self, key: &str) -> Option<&str> {
        non_blank(self.query_string_parameters.as_ref(), key)
    }

    pub fn method_is(&self, method: &str) -> bool {
        self.http_method.trim().eq_ignore_ascii_case(method)
    }

    /// Decodes the JSON body. A missing or blank body yields all fields absent.
    pub fn customer_body(&self) -> Result<CustomerBody, ApplicationError> {
        let raw = match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => return Ok(CustomerBody::default()),
        };

        let bytes = if self.is_base64_encoded {
            STANDARD
                .decode(raw.trim())
                .map_err(|_| ApplicationError::invalid_input(INVALID_BODY_MESSAGE))?
        } else {
            raw.as_bytes().to_vec()
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(CustomerBody::default());
        }

        serde_json::from_slice(&bytes).map_err(|_| ApplicationError::invalid_input(INVALID_BODY_MESSAGE))
    }
}

fn non_blank<'a>(map: Option<&'a HashMap<String, String>>, key: &str) -> Option<&'a str> {
    map.and_then(|values| values.get(key)).map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl GatewayResponse {
    pub fn json(status_code: u16, body: Vec<u8>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self { status_code, headers, body: String::from_utf8_lossy(&body).into_owned() }
    }
}
