use std::env;
use std::fs;
use std::path::Path;

use spectrum_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG_FAILURE};

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG_FAILURE,
            );
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: flags > env > file > default):".to_string(),
    ];
    for field in fields(&config) {
        let source = field_source(
            &field,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key_path, field.value));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let artifacts = &config.artifacts;
    let recommendation = &config.recommendation;
    let labels = config
        .segments
        .labels
        .iter()
        .enumerate()
        .map(|(cluster, segment)| format!("{cluster}={}", segment.label()))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        Field {
            key_path: "artifacts.catalog_path",
            env_keys: &["SPECTRUM_ARTIFACTS_CATALOG_PATH"],
            value: artifacts.catalog_path.display().to_string(),
        },
        Field {
            key_path: "artifacts.catalog_encoding",
            env_keys: &["SPECTRUM_ARTIFACTS_CATALOG_ENCODING"],
            value: format!("{:?}", artifacts.catalog_encoding),
        },
        Field {
            key_path: "artifacts.similarity_path",
            env_keys: &["SPECTRUM_ARTIFACTS_SIMILARITY_PATH"],
            value: artifacts.similarity_path.display().to_string(),
        },
        Field {
            key_path: "artifacts.segment_model_path",
            env_keys: &["SPECTRUM_ARTIFACTS_SEGMENT_MODEL_PATH"],
            value: artifacts.segment_model_path.display().to_string(),
        },
        Field {
            key_path: "recommendation.identity_key",
            env_keys: &["SPECTRUM_RECOMMENDATION_IDENTITY_KEY"],
            value: format!("{:?}", recommendation.identity_key),
        },
        Field {
            key_path: "recommendation.fuzzy_enabled",
            env_keys: &["SPECTRUM_RECOMMENDATION_FUZZY_ENABLED"],
            value: recommendation.fuzzy_active().to_string(),
        },
        Field {
            key_path: "recommendation.fuzzy_threshold",
            env_keys: &["SPECTRUM_RECOMMENDATION_FUZZY_THRESHOLD"],
            value: recommendation.fuzzy_threshold.to_string(),
        },
        Field {
            key_path: "recommendation.top_k",
            env_keys: &["SPECTRUM_RECOMMENDATION_TOP_K"],
            value: recommendation.top_k.to_string(),
        },
        Field {
            key_path: "segments.labels",
            env_keys: &["SPECTRUM_SEGMENTS_LABELS"],
            value: labels,
        },
        Field {
            key_path: "server.bind_address",
            env_keys: &["SPECTRUM_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Field {
            key_path: "server.port",
            env_keys: &["SPECTRUM_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["SPECTRUM_LOGGING_LEVEL", "SPECTRUM_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["SPECTRUM_LOGGING_FORMAT", "SPECTRUM_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, field.key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
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
