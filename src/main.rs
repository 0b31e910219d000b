use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use portrait_forge::cli::{self, Args, Command, GenerateOptions};
use portrait_forge::export::ExportFormat;

/// Load .env file.
///
/// Loads environment variables from .env file in the working directory.
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();
    let config_path = args.config.as_deref();
    let output = args.output.as_deref();

    let result = match args.command {
        Command::Generate {
            backend,
            force,
            only,
            export,
        } => {
            let cancel = Arc::new(AtomicBool::new(false));
            if let Err(e) = cli::setup_ctrlc_handler(cancel.clone()) {
                log::warn!("Could not install Ctrl+C handler: {}", e);
            }
            cli::run_generate(
                config_path,
                output,
                GenerateOptions {
                    backend,
                    force,
                    only,
                    export,
                },
                cancel,
            )
        }
        Command::Convert => cli::run_convert(config_path, output),
        Command::Export { json } => {
            let format = if json {
                ExportFormat::Json
            } else {
                ExportFormat::JavaScript
            };
            cli::run_export(config_path, output, format)
        }
        Command::Config { action } => cli::handle_config_action(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
