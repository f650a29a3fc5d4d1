use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::DEFAULT_FUZZY_THRESHOLD;
use crate::domain::product::IdentityKey;
use crate::domain::segment::Segment;
use crate::segment::SegmentLabels;
use crate::similarity::DEFAULT_TOP_K;

pub const CONFIG_FILE_NAME: &str = "spectrum.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub recommendation: RecommendationConfig,
    pub segments: SegmentsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ArtifactsConfig {
    pub catalog_path: PathBuf,
    pub catalog_encoding: TextEncoding,
    pub similarity_path: PathBuf,
    pub segment_model_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub identity_key: IdentityKey,
    /// Unset follows the identity key: on for descriptions, off for stock codes.
    pub fuzzy_enabled: Option<bool>,
    pub fuzzy_threshold: u8,
    pub top_k: usize,
}

impl RecommendationConfig {
    pub fn fuzzy_active(&self) -> bool {
        self.fuzzy_enabled.unwrap_or(self.identity_key == IdentityKey::Description)
    }
}

#[derive(Clone, Debug)]
pub struct SegmentsConfig {
    pub labels: Vec<Segment>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub similarity_path: Option<PathBuf>,
    pub segment_model_path: Option<PathBuf>,
    pub identity_key: Option<IdentityKey>,
    pub fuzzy_enabled: Option<bool>,
    pub top_k: Option<usize>,
    pub log_level: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                catalog_path: PathBuf::from("data/online_retail.csv"),
                catalog_encoding: TextEncoding::Latin1,
                similarity_path: PathBuf::from("models/product_similarity.json"),
                segment_model_path: PathBuf::from("models/rfm_kmeans_model.json"),
            },
            recommendation: RecommendationConfig {
                identity_key: IdentityKey::Description,
                fuzzy_enabled: None,
                fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
                top_k: DEFAULT_TOP_K,
            },
            segments: SegmentsConfig { labels: SegmentLabels::default().segments().to_vec() },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8501 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(ConfigError::Validation(format!(
                "unsupported catalog encoding `{other}` (expected utf8|latin1)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Label table for cluster indices. Only meaningful after `validate`.
    pub fn segment_labels(&self) -> SegmentLabels {
        match <[Segment; 4]>::try_from(self.segments.labels.as_slice()) {
            Ok(segments) => SegmentLabels::new(segments),
            Err(_) => SegmentLabels::default(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(artifacts) = patch.artifacts {
            if let Some(catalog_path) = artifacts.catalog_path {
                self.artifacts.catalog_path = catalog_path;
            }
            if let Some(catalog_encoding) = artifacts.catalog_encoding {
                self.artifacts.catalog_encoding = catalog_encoding;
            }
            if let Some(similarity_path) = artifacts.similarity_path {
                self.artifacts.similarity_path = similarity_path;
            }
            if let Some(segment_model_path) = artifacts.segment_model_path {
                self.artifacts.segment_model_path = segment_model_path;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(identity_key) = recommendation.identity_key {
                self.recommendation.identity_key = identity_key;
            }
            if let Some(fuzzy_enabled) = recommendation.fuzzy_enabled {
                self.recommendation.fuzzy_enabled = Some(fuzzy_enabled);
            }
            if let Some(fuzzy_threshold) = recommendation.fuzzy_threshold {
                self.recommendation.fuzzy_threshold = fuzzy_threshold;
            }
            if let Some(top_k) = recommendation.top_k {
                self.recommendation.top_k = top_k;
            }
        }

        if let Some(segments) = patch.segments {
            if let Some(labels) = segments.labels {
                self.segments.labels = parse_segment_labels("segments.labels", &labels)?;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SPECTRUM_ARTIFACTS_CATALOG_PATH") {
            self.artifacts.catalog_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("SPECTRUM_ARTIFACTS_CATALOG_ENCODING") {
            self.artifacts.catalog_encoding = value.parse()?;
        }
        if let Some(value) = read_env("SPECTRUM_ARTIFACTS_SIMILARITY_PATH") {
            self.artifacts.similarity_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("SPECTRUM_ARTIFACTS_SEGMENT_MODEL_PATH") {
            self.artifacts.segment_model_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("SPECTRUM_RECOMMENDATION_IDENTITY_KEY") {
            self.recommendation.identity_key = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "SPECTRUM_RECOMMENDATION_IDENTITY_KEY".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATION_FUZZY_ENABLED") {
            self.recommendation.fuzzy_enabled =
                Some(parse_bool("SPECTRUM_RECOMMENDATION_FUZZY_ENABLED", &value)?);
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATION_FUZZY_THRESHOLD") {
            self.recommendation.fuzzy_threshold =
                parse_u8("SPECTRUM_RECOMMENDATION_FUZZY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATION_TOP_K") {
            self.recommendation.top_k = parse_usize("SPECTRUM_RECOMMENDATION_TOP_K", &value)?;
        }

        if let Some(value) = read_env("SPECTRUM_SEGMENTS_LABELS") {
            let labels: Vec<String> = value.split(',').map(|label| label.to_string()).collect();
            self.segments.labels = parse_segment_labels("SPECTRUM_SEGMENTS_LABELS", &labels)?;
        }

        if let Some(value) = read_env("SPECTRUM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SPECTRUM_SERVER_PORT") {
            self.server.port = parse_u16("SPECTRUM_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("SPECTRUM_LOGGING_LEVEL").or_else(|| read_env("SPECTRUM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SPECTRUM_LOGGING_FORMAT").or_else(|| read_env("SPECTRUM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.artifacts.catalog_path = catalog_path;
        }
        if let Some(similarity_path) = overrides.similarity_path {
            self.artifacts.similarity_path = similarity_path;
        }
        if let Some(segment_model_path) = overrides.segment_model_path {
            self.artifacts.segment_model_path = segment_model_path;
        }
        if let Some(identity_key) = overrides.identity_key {
            self.recommendation.identity_key = identity_key;
        }
        if let Some(fuzzy_enabled) = overrides.fuzzy_enabled {
            self.recommendation.fuzzy_enabled = Some(fuzzy_enabled);
        }
        if let Some(top_k) = overrides.top_k {
            self.recommendation.top_k = top_k;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_artifacts(&self.artifacts)?;
        validate_recommendation(&self.recommendation)?;
        validate_segments(&self.segments)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Path of the config file `load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn parse_segment_labels(key: &str, labels: &[String]) -> Result<Vec<Segment>, ConfigError> {
    labels
        .iter()
        .map(|label| {
            label.parse::<Segment>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: label.trim().to_string(),
            })
        })
        .collect()
}

fn validate_artifacts(artifacts: &ArtifactsConfig) -> Result<(), ConfigError> {
    let paths = [
        ("artifacts.catalog_path", &artifacts.catalog_path),
        ("artifacts.similarity_path", &artifacts.similarity_path),
        ("artifacts.segment_model_path", &artifacts.segment_model_path),
    ];
    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{name} must not be empty")));
        }
    }
    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.fuzzy_threshold > 100 {
        return Err(ConfigError::Validation(
            "recommendation.fuzzy_threshold must be in range 0..=100".to_string(),
        ));
    }

    if recommendation.top_k == 0 || recommendation.top_k > 50 {
        return Err(ConfigError::Validation(
            "recommendation.top_k must be in range 1..=50".to_string(),
        ));
    }

    Ok(())
}

fn validate_segments(segments: &SegmentsConfig) -> Result<(), ConfigError> {
    if segments.labels.len() != 4 {
        return Err(ConfigError::Validation(format!(
            "segments.labels must list exactly 4 segments, got {}",
            segments.labels.len()
        )));
    }

    for (index, segment) in segments.labels.iter().enumerate() {
        if segments.labels[..index].contains(segment) {
            return Err(ConfigError::Validation(format!(
                "segments.labels lists `{}` more than once",
                segment.label()
            )));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.trim().parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    artifacts: Option<ArtifactsPatch>,
    recommendation: Option<RecommendationPatch>,
    segments: Option<SegmentsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactsPatch {
    catalog_path: Option<PathBuf>,
    catalog_encoding: Option<TextEncoding>,
    similarity_path: Option<PathBuf>,
    segment_model_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    identity_key: Option<IdentityKey>,
    fuzzy_enabled: Option<bool>,
    fuzzy_threshold: Option<u8>,
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentsPatch {
    labels: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
