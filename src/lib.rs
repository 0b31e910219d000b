//! portrait-forge library crate.
//!
//! Renders AI-generated character portraits as ASCII art and batch-generates
//! them across every race and race/class combination.

pub mod cli;
pub mod config;
pub mod convert;
pub mod export;
pub mod key;
pub mod manifest;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod render;
pub mod store;
