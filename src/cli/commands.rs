//! Subcommand handlers for generate, convert, export and config actions.
//!
//! Handlers return `Err(String)` with a user-facing message; `main` prints it
//! and exits with status 1.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::Ordering;

use super::args::ConfigAction;
use super::enums::BackendArg;
use crate::config::{default_path as get_config_path, Config, DEFAULT_CONFIG_TEMPLATE};
use crate::convert::reconvert;
use crate::export::{ExportFormat, PortraitExport};
use crate::key::slugify;
use crate::orchestrator::{CancelFlag, PortraitOrchestrator, RunConfig, RunReport};
use crate::provider::{Backend, ProviderError, RetryingProvider};
use crate::store::DirectoryStore;

/// Options for the generate subcommand.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub backend: Option<BackendArg>,
    pub force: bool,
    pub only: Vec<String>,
    pub export: bool,
}

/// Set up the Ctrl+C handler. The current portrait finishes before the run stops.
pub fn setup_ctrlc_handler(cancel: CancelFlag) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, stopping after the current portrait...");
    })
}

/// Load the config, requiring the file to exist when it was named explicitly.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let result = match path {
        Some(p) => Config::load_explicit(p),
        None => Config::load(None),
    };
    result.map_err(|e| e.to_string())
}

fn run_config(config: &Config, backend: Backend, force: bool, only: &[String]) -> Result<RunConfig, String> {
    let only: Option<BTreeSet<String>> = if only.is_empty() {
        None
    } else {
        Some(only.iter().map(|key| slugify(key)).collect())
    };
    Ok(RunConfig {
        races: config.races(),
        classes: config.classes(),
        render: config.render_settings().map_err(|e| e.to_string())?,
        force,
        only,
        pacing: config.pacing(backend),
    })
}

fn open_store(config: &Config, output: Option<&Path>) -> Result<DirectoryStore, String> {
    DirectoryStore::new_initialized(config.output_dir(output))
        .map_err(|e| format!("Failed to initialize output directory: {}", e))
}

/// Run the generate subcommand.
pub fn run_generate(
    config_path: Option<&Path>,
    output: Option<&Path>,
    options: GenerateOptions,
    cancel: CancelFlag,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let backend = config
        .backend(options.backend.map(Backend::from))
        .map_err(|e| e.to_string())?;
    let run_config = run_config(&config, backend, options.force, &options.only)?;
    let store = open_store(&config, output)?;

    let client = backend
        .connect(
            config.provider.base_url.as_deref(),
            config.provider.model.as_deref(),
        )
        .map_err(|e| match e {
            ProviderError::MissingApiKey { env } => format!(
                "{env} environment variable is not set.\n\n\
                Add your API key to a .env file:\n    \
                    echo '{env}=your-api-key-here' >> .env\n\n\
                Or set it as an environment variable:\n    \
                    export {env}=\"your-api-key-here\""
            ),
            _ => format!("Failed to create {} client: {}", backend.name(), e),
        })?;
    let provider = RetryingProvider::new(client, config.retry_policy(backend));

    println!(
        "Generating portraits into {} with {}",
        store.root().display(),
        backend.name()
    );
    println!();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    let orchestrator =
        PortraitOrchestrator::new(&provider, &store, run_config).with_cancel_flag(cancel);
    let report = rt.block_on(orchestrator.run()).map_err(|e| e.to_string())?;

    print_summary(&report, backend);

    if options.export {
        export_to(&store, &config, ExportFormat::JavaScript)?;
    }

    let stats = report.stats();
    if stats.failed > 0 && stats.successful == 0 && stats.skipped == 0 {
        Err("All portraits failed to generate".to_string())
    } else {
        Ok(())
    }
}

/// Command that retries exactly the failed keys of a run.
pub fn rerun_command(failed_keys: &[String], backend: Backend) -> String {
    let mut command = format!("portrait-forge generate --backend {} --force", backend.name());
    for key in failed_keys {
        command.push_str(" --only ");
        command.push_str(key);
    }
    command
}

fn print_summary(report: &RunReport, backend: Backend) {
    let stats = report.stats();
    println!();
    println!("Generation complete:");
    println!("  Generated: {}", stats.successful);
    println!("  Skipped (existing): {}", stats.skipped);
    println!("  Failed: {}", stats.failed);
    println!("  Success rate: {:.1}%", stats.success_rate());

    let failed = report.failed_keys();
    if !failed.is_empty() {
        println!();
        println!("Failed portraits:");
        for record in report.failures() {
            println!(
                "  {}: {}",
                record.key,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
        println!("Re-run just these with:");
        println!("  {}", rerun_command(&failed, backend));
    }
}

/// Run the convert subcommand.
pub fn run_convert(config_path: Option<&Path>, output: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let backend = config.backend(None).map_err(|e| e.to_string())?;
    let run_config = run_config(&config, backend, false, &[])?;
    let store = open_store(&config, output)?;

    let keys = run_config.universe();
    let snapshot = run_config.snapshot(backend.name());
    let report = reconvert(&store, &keys, &run_config.render, &snapshot)
        .map_err(|e| format!("Conversion aborted: {}", e))?;

    println!();
    println!("Conversion complete:");
    println!("  Converted: {}", report.converted.len());
    println!("  Without image: {}", report.missing);
    if !report.failed.is_empty() {
        println!("  Failed: {}", report.failed.len());
        for (slug, error) in &report.failed {
            println!("    {}: {}", slug, error);
        }
    }

    if report.converted.is_empty() && !report.failed.is_empty() {
        Err("No images could be converted".to_string())
    } else {
        Ok(())
    }
}

/// Run the export subcommand.
pub fn run_export(
    config_path: Option<&Path>,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let store = open_store(&config, output)?;
    export_to(&store, &config, format)
}

fn export_to(store: &DirectoryStore, config: &Config, format: ExportFormat) -> Result<(), String> {
    let keys = crate::key::enumerate_keys(&config.races(), &config.classes());
    let export = PortraitExport::from_store(store, &keys)
        .map_err(|e| format!("Failed to read ascii art: {}", e))?;
    if export.is_empty() {
        return Err(format!(
            "No ascii art found in {}. Run 'portrait-forge generate' first.",
            store.ascii_dir().display()
        ));
    }

    let path = export
        .save(store.root(), format)
        .map_err(|e| format!("Failed to write export: {}", e))?;
    println!(
        "Exported {} portraits ({} races, {} combinations) to {}",
        export.len(),
        export.races.len(),
        export.race_class.len(),
        path.display()
    );
    if format == ExportFormat::JavaScript {
        println!("   Import in your app: import {{ getPortrait }} from './portraits.js'");
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) -> Result<(), String> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let backend = config.backend(None).map_err(|e| e.to_string())?;
            let render = config.render_settings().map_err(|e| e.to_string())?;
            let policy = config.retry_policy(backend);

            println!("Current configuration:");
            println!("  Races: {}", config.races().join(", "));
            println!("  Classes: {}", config.classes().join(", "));
            println!("  Resolution: {}x{}", render.width, render.height);
            println!("  Ramp: {:?} ({} levels)", render.ramp.to_string(), render.ramp.len());
            println!("  Invert: {}", if render.invert { "yes" } else { "no" });
            println!("  Backend: {}", backend.name());
            println!(
                "  Retries: {} attempts, {:?} apart, {:?} per attempt",
                policy.max_attempts, policy.delay, policy.attempt_timeout
            );
            println!("  Pacing: {:?}", config.pacing(backend));
            println!("  Output: {}", config.output_dir(None).display());
            println!();

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'portrait-forge config show' to view current settings.",
                    path.display()
                ));
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}
