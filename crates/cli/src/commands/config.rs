use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use memberdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigEntry {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key_path,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", entry.key_path, entry.value));
    }

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<ConfigEntry> {
    vec![
        ConfigEntry {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["MEMBERDESK_DATABASE_URL"],
        },
        ConfigEntry {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["MEMBERDESK_DATABASE_MAX_CONNECTIONS"],
        },
        ConfigEntry {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["MEMBERDESK_DATABASE_TIMEOUT_SECS"],
        },
        ConfigEntry {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["MEMBERDESK_SERVER_BIND_ADDRESS"],
        },
        ConfigEntry {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["MEMBERDESK_SERVER_PORT"],
        },
        ConfigEntry {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["MEMBERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        ConfigEntry {
            key_path: "client.api_base_url",
            value: config.client.api_base_url.clone(),
            env_keys: &["MEMBERDESK_API_BASE_URL", "NEXT_PUBLIC_API_URL"],
        },
        ConfigEntry {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["MEMBERDESK_LOGGING_LEVEL", "MEMBERDESK_LOG_LEVEL"],
        },
        ConfigEntry {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["MEMBERDESK_LOGGING_FORMAT", "MEMBERDESK_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["memberdesk.toml", "config/memberdesk.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

/// The first env key that is set wins, mirroring alias order in the loader.
fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_set = |key: &str| env::var(key).is_ok_and(|value| !value.trim().is_empty());
    if let Some(env_key) = env_keys.iter().find(|key| env_set(**key)) {
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
