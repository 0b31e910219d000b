//! CLI enum types for backend selection.

use clap::ValueEnum;

use crate::provider::Backend;

/// Image generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendArg {
    #[default]
    Openai,
    Fal,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Openai => Backend::OpenAi,
            BackendArg::Fal => Backend::Fal,
        }
    }
}
