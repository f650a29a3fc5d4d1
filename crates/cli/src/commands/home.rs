use spectrum_core::pages::home_view;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    CommandResult::view("home", &home_view(), false)
}
