use spectrum_core::config::LoadOptions;
use spectrum_core::pages::{dispatch, PageRequest};

use crate::commands::{load_app, CommandResult};

pub fn run(
    options: &LoadOptions,
    recency: f64,
    frequency: f64,
    monetary: f64,
    json_output: bool,
) -> CommandResult {
    let app = match load_app("segment", options) {
        Ok(app) => app,
        Err(failure) => return failure,
    };

    let view = dispatch(&app, &PageRequest::Clustering { recency, frequency, monetary });
    CommandResult::view("segment", &view, json_output)
}
