use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use patron_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    for (key_path, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<Entry> {
    let format = match config.logging.format {
        Some(format) => format!("{format:?}").to_lowercase(),
        None => format!("{} (derived)", format!("{:?}", config.log_format()).to_lowercase()),
    };

    vec![
        entry("database.backend", config.database.backend.to_string(), &["PATRON_DATABASE_BACKEND"]),
        entry("database.url", config.database.url.clone(), &["PATRON_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PATRON_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PATRON_DATABASE_TIMEOUT_SECS"],
        ),
        entry("environment", config.environment.as_str().to_string(), &["PATRON_ENVIRONMENT"]),
        entry("auth.secret", redact_secret(config.auth.secret.expose_secret()), &["PATRON_AUTH_SECRET"]),
        entry("auth.issuer", config.auth.issuer.clone(), &["PATRON_AUTH_ISSUER"]),
        entry("auth.audience", config.auth.audience.clone(), &["PATRON_AUTH_AUDIENCE"]),
        entry(
            "auth.expiration_secs",
            config.auth.expiration_secs.to_string(),
            &["PATRON_AUTH_EXPIRATION_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["PATRON_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["PATRON_SERVER_PORT"]),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["PATRON_LOGGING_LEVEL", "PATRON_LOG_LEVEL"],
        ),
        entry("logging.format", format, &["PATRON_LOGGING_FORMAT", "PATRON_LOG_FORMAT"]),
    ]
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key_path, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("patron.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/patron.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    format!("<redacted, {} bytes>", trimmed.len())
}
