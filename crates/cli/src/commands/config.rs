use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use apex_core::config::AppConfig;
use toml::Value;

use super::{load_config, CommandResult};

struct ConfigField {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key_path, field.value));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let api_key = if config.llm.has_credential() { "<redacted>" } else { "<unset>" };
    let cors = if config.server.cors_allowed_origins.is_empty() {
        "*".to_string()
    } else {
        config.server.cors_allowed_origins.join(",")
    };

    vec![
        ConfigField {
            key_path: "llm.api_key",
            value: api_key.to_string(),
            env_keys: &["APEX_LLM_API_KEY", "GEMINI_API_KEY"],
        },
        ConfigField {
            key_path: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["APEX_LLM_BASE_URL"],
        },
        ConfigField {
            key_path: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["APEX_LLM_MODEL"],
        },
        ConfigField {
            key_path: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["APEX_LLM_TEMPERATURE"],
        },
        ConfigField {
            key_path: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["APEX_LLM_TIMEOUT_SECS"],
        },
        ConfigField {
            key_path: "agents.history_window",
            value: config.agents.history_window.to_string(),
            env_keys: &["APEX_AGENTS_HISTORY_WINDOW"],
        },
        ConfigField {
            key_path: "agents.max_conversations",
            value: config.agents.max_conversations.to_string(),
            env_keys: &["APEX_AGENTS_MAX_CONVERSATIONS"],
        },
        ConfigField {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["APEX_SERVER_BIND_ADDRESS"],
        },
        ConfigField {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["APEX_SERVER_PORT"],
        },
        ConfigField {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["APEX_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        ConfigField {
            key_path: "server.cors_allowed_origins",
            value: cors,
            env_keys: &["APEX_SERVER_CORS_ALLOWED_ORIGINS"],
        },
        ConfigField {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["APEX_LOGGING_LEVEL", "APEX_LOG_LEVEL"],
        },
        ConfigField {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["APEX_LOGGING_FORMAT", "APEX_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("apex.toml"), PathBuf::from("config/apex.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &ConfigField,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_hit = field
        .env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = env_hit {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key_path) {
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
