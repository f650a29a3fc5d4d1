pub mod config;
pub mod doctor;
pub mod home;
pub mod recommend;
pub mod segment;

use serde::Serialize;
use spectrum_core::config::{AppConfig, LoadOptions};
use spectrum_core::pages::{Outcome, PageView};
use spectrum_core::App;

pub const EXIT_OK: u8 = 0;
pub const EXIT_DOMAIN_WARNING: u8 = 1;
pub const EXIT_CONFIG_FAILURE: u8 = 2;
pub const EXIT_ARTIFACT_FAILURE: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Page output, as text or as the serialized view.
    pub fn view(command: &str, view: &PageView, json_output: bool) -> Self {
        let exit_code = match view.outcome {
            Outcome::Rendered => EXIT_OK,
            Outcome::NotFound | Outcome::InvalidInput => EXIT_DOMAIN_WARNING,
            Outcome::Failed => EXIT_ARTIFACT_FAILURE,
        };

        if !json_output {
            return Self { exit_code, output: view.render_text() };
        }

        match serde_json::to_string_pretty(view) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), exit_code),
        }
    }
}

/// Loads config and artifacts, or the failure payload to print instead.
pub fn load_app(command: &str, options: &LoadOptions) -> Result<App, CommandResult> {
    let config = AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG_FAILURE,
        )
    })?;

    App::load(&config).map_err(|error| {
        CommandResult::failure(
            command,
            "artifact_load",
            format!("artifact issue: {error}"),
            EXIT_ARTIFACT_FAILURE,
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
