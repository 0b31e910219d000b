//! Configuration file handling for portrait-forge.
//!
//! Loads configuration from `~/.config/portrait-forge/config.toml` or a custom path.
//! API keys are never read from this file; they come from the environment or `.env`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompt;
use crate::provider::{Backoff, Backend, RetryPolicy, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use crate::render::{GlyphRamp, RampPreset, RenderSettings, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::store::DirectoryStore;

/// Configuration file structure for portrait-forge.
/// Loaded from ~/.config/portrait-forge/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub races: Option<Vec<String>>,
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Preset name: portrait, standard, blocks, minimal
    #[serde(default)]
    pub ramp: Option<String>,
    /// Custom glyphs, sparse to dense. Overrides `ramp`.
    #[serde(default)]
    pub glyphs: Option<String>,
    #[serde(default)]
    pub invert: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            ramp: None,
            glyphs: None,
            invert: false,
        }
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderConfig {
    /// openai or fal
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
    #[serde(default)]
    pub exponential_backoff: bool,
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
    #[serde(default)]
    pub pacing_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load from a path the user named explicitly; the file must exist.
    pub fn load_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::IoError {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        Self::load(Some(path))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn races(&self) -> Vec<String> {
        self.roster
            .races
            .clone()
            .unwrap_or_else(prompt::default_races)
    }

    pub fn classes(&self) -> Vec<String> {
        self.roster
            .classes
            .clone()
            .unwrap_or_else(prompt::default_classes)
    }

    /// Build the rendering settings, validating ramp and resolution.
    pub fn render_settings(&self) -> Result<RenderSettings, ConfigError> {
        let render = &self.render;
        if render.width == 0 || render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render resolution must be non-zero, got {}x{}",
                render.width, render.height
            )));
        }

        let ramp = match (&render.glyphs, &render.ramp) {
            (Some(glyphs), _) => {
                GlyphRamp::new(glyphs).map_err(|e| ConfigError::Invalid(e.to_string()))?
            }
            (None, Some(name)) => RampPreset::from_name(name)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "unknown ramp '{}' (expected portrait, standard, blocks or minimal)",
                        name
                    ))
                })?
                .ramp(),
            (None, None) => GlyphRamp::default(),
        };

        Ok(RenderSettings {
            width: render.width,
            height: render.height,
            ramp,
            invert: render.invert,
        })
    }

    /// The configured backend, unless overridden on the command line.
    pub fn backend(&self, cli_override: Option<Backend>) -> Result<Backend, ConfigError> {
        if let Some(backend) = cli_override {
            return Ok(backend);
        }
        match &self.provider.backend {
            None => Ok(Backend::default()),
            Some(name) => Backend::from_name(name).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown backend '{}' (expected openai or fal)",
                    name
                ))
            }),
        }
    }

    pub fn retry_policy(&self, backend: Backend) -> RetryPolicy {
        let provider = &self.provider;
        RetryPolicy {
            max_attempts: provider.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            delay: provider
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| backend.default_retry_delay()),
            backoff: if provider.exponential_backoff {
                Backoff::Exponential
            } else {
                Backoff::Fixed
            },
            attempt_timeout: provider
                .attempt_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }

    pub fn pacing(&self, backend: Backend) -> Duration {
        self.provider
            .pacing_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| backend.default_pacing())
    }

    /// Output root: CLI override, then config, then the platform data dir.
    pub fn output_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(PathBuf::from)
            .or_else(|| self.output.dir.clone())
            .unwrap_or_else(DirectoryStore::default_root)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Invalid(message) => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("portrait-forge").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/portrait-forge/config.toml")
        })
}

/// Commented template written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# portrait-forge configuration
# API keys are read from OPENAI_API_KEY / FAL_API_KEY (environment or .env).

[roster]
# races = ["Dwarf", "Elf", "Halfling", "Human", "Dragonborn", "Gnome", "Half-Elf", "Half-Orc", "Tiefling"]
# classes = ["Barbarian", "Bard", "Cleric", "Druid", "Fighter", "Monk", "Paladin", "Ranger", "Rogue", "Sorcerer", "Warlock", "Wizard"]

[render]
# ASCII resolution in characters
width = 160
height = 80
# Ramp preset: portrait, standard, blocks, minimal
ramp = "portrait"
# Custom glyphs, sparse to dense (overrides ramp)
# glyphs = " .:-=+*#%@"
# Map bright pixels to sparse glyphs (for light backgrounds)
invert = false

[provider]
# Backend: openai or fal
backend = "openai"
# model = "dall-e-3"
# base_url = "https://api.openai.com"
max_attempts = 3
# Seconds between attempts (default: 5 for openai, 2 for fal)
# retry_delay_secs = 5
exponential_backoff = false
attempt_timeout_secs = 180
# Seconds between generation requests (default: 5 for openai, 2 for fal)
# pacing_secs = 5

[output]
# dir = "generated_portraits"
"#;
