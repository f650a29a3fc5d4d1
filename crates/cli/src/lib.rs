pub mod commands;

use clap::{Parser, Subcommand};
use spectrum_core::config::{AppConfig, LoadOptions, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "spectrum",
    about = "Shopper Spectrum operator CLI",
    long_about = "Segment customers from RFM values, recommend similar products, and inspect runtime readiness.",
    after_help = "Examples:\n  spectrum recommend \"WHITE HANGING HEART T-LIGHT HOLDER\"\n  spectrum segment --recency 12 --frequency 8 --monetary 950\n  spectrum doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show the welcome page and the available pages")]
    Home,
    #[command(
        about = "Predict the customer segment for a set of RFM values",
        allow_negative_numbers = true
    )]
    Segment {
        #[arg(long, help = "Days since the customer's last purchase")]
        recency: f64,
        #[arg(long, help = "Number of purchases")]
        frequency: f64,
        #[arg(long, help = "Total spend")]
        monetary: f64,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List products similar to the named one")]
    Recommend {
        #[arg(help = "Product name, matched case-insensitively with typo tolerance")]
        product: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, artifact loading, and segment label mapping")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = load_options(cli.config);
    init_logging(&options);

    let result = match cli.command {
        Command::Home => commands::home::run(),
        Command::Segment { recency, frequency, monetary, json } => {
            commands::segment::run(&options, recency, frequency, monetary, json)
        }
        Command::Recommend { product, json } => commands::recommend::run(&options, &product, json),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn load_options(config_path: Option<PathBuf>) -> LoadOptions {
    let require_file = config_path.is_some();
    LoadOptions { config_path, require_file, ..LoadOptions::default() }
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(options: &LoadOptions) {
    use tracing::Level;

    let Ok(config) = AppConfig::load(options.clone()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
