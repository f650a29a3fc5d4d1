use spectrum_core::config::LoadOptions;
use spectrum_core::pages::{dispatch, PageRequest};

use crate::commands::{load_app, CommandResult};

pub fn run(options: &LoadOptions, product: &str, json_output: bool) -> CommandResult {
    let app = match load_app("recommend", options) {
        Ok(app) => app,
        Err(failure) => return failure,
    };

    let view = dispatch(&app, &PageRequest::Recommendation { product: product.to_owned() });
    CommandResult::view("recommend", &view, json_output)
}
