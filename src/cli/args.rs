//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::BackendArg;

/// Generate D&D character portraits and render them as ASCII art
#[derive(Parser, Debug)]
#[command(name = "portrait-forge")]
#[command(version, about = "AI character portraits rendered as ASCII art", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Generate every missing portrait with OpenAI
    portrait-forge generate

    # Use fal.ai and write portraits.js afterwards
    portrait-forge generate --backend fal --export

    # Retry two failed keys
    portrait-forge generate --force --only half-orc-warlock --only elf-bard

    # Re-render ascii after changing the ramp in config.toml
    portrait-forge convert

    # Export as JSON instead of a JavaScript module
    portrait-forge export --json")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory for images, ascii art and the manifest
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate portraits for every race and race/class combination
    Generate {
        /// Image backend (default: from config, else openai)
        #[arg(long, short)]
        backend: Option<BackendArg>,

        /// Regenerate portraits that already exist
        #[arg(long, short)]
        force: bool,

        /// Only process these keys (e.g. dwarf, half-orc-warlock)
        #[arg(long, value_name = "KEY")]
        only: Vec<String>,

        /// Write portraits.js after the run
        #[arg(long)]
        export: bool,
    },
    /// Re-render ascii art from stored images without calling a backend
    Convert,
    /// Export ascii art as a JavaScript module
    Export {
        /// Write portraits.json instead
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let args = Args::parse_from(["portrait-forge", "generate"]);
        match args.command {
            Command::Generate {
                backend,
                force,
                only,
                export,
            } => {
                assert!(backend.is_none());
                assert!(!force);
                assert!(only.is_empty());
                assert!(!export);
            }
            _ => panic!("Expected Generate subcommand"),
        }
        assert!(args.config.is_none());
        assert!(args.output.is_none());
    }

    #[test]
    fn test_generate_all_flags() {
        let args = Args::parse_from([
            "portrait-forge",
            "generate",
            "--backend",
            "fal",
            "--force",
            "--only",
            "dwarf",
            "--only",
            "half-orc-warlock",
            "--export",
        ]);
        match args.command {
            Command::Generate {
                backend,
                force,
                only,
                export,
            } => {
                assert_eq!(backend, Some(BackendArg::Fal));
                assert!(force);
                assert_eq!(only, vec!["dwarf", "half-orc-warlock"]);
                assert!(export);
            }
            _ => panic!("Expected Generate subcommand"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::parse_from([
            "portrait-forge",
            "convert",
            "--config",
            "/tmp/config.toml",
            "-o",
            "/tmp/out",
        ]);
        assert!(matches!(args.command, Command::Convert));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));
        assert_eq!(args.output, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_export_json_flag() {
        let args = Args::parse_from(["portrait-forge", "export", "--json"]);
        assert!(matches!(args.command, Command::Export { json: true }));
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::parse_from(["portrait-forge", "config", "show"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));

        let args = Args::parse_from(["portrait-forge", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Args::try_parse_from(["portrait-forge", "generate", "--backend", "gemini"]);
        assert!(result.is_err());
    }
}
