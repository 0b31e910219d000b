//! Glyph ramp definitions for ASCII rendering.

use sha2::{Digest, Sha256};
use std::fmt;

/// Portrait density ramp (69 levels).
/// Ordered from sparsest (space) to densest (`$`).
pub const PORTRAIT_RAMP: &str =
    "  .`'\",;:Il!i><~+_-?][}{1)(|/\\trjxnuvczXYUJCLQ0OZmwqpdbkha*o#MW&8%B@$";

/// Standard ASCII density ramp (10 levels).
pub const STANDARD_RAMP: &str = " .:-=+*#%@";

/// Block character ramp (5 levels).
/// Uses Unicode block characters for higher perceived resolution.
pub const BLOCKS_RAMP: &str = " ░▒▓█";

/// Minimal ramp (4 levels).
pub const MINIMAL_RAMP: &str = " .:#";

/// Named ramp presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampPreset {
    #[default]
    Portrait,
    Standard,
    Blocks,
    Minimal,
}

impl RampPreset {
    /// Parse a preset by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "portrait" => Some(RampPreset::Portrait),
            "standard" => Some(RampPreset::Standard),
            "blocks" => Some(RampPreset::Blocks),
            "minimal" => Some(RampPreset::Minimal),
            _ => None,
        }
    }

    pub fn glyphs(&self) -> &'static str {
        match self {
            RampPreset::Portrait => PORTRAIT_RAMP,
            RampPreset::Standard => STANDARD_RAMP,
            RampPreset::Blocks => BLOCKS_RAMP,
            RampPreset::Minimal => MINIMAL_RAMP,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RampPreset::Portrait => "portrait",
            RampPreset::Standard => "standard",
            RampPreset::Blocks => "blocks",
            RampPreset::Minimal => "minimal",
        }
    }

    pub fn ramp(&self) -> GlyphRamp {
        GlyphRamp {
            glyphs: self.glyphs().chars().collect(),
        }
    }
}

/// Errors raised when building a glyph ramp.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RampError {
    #[error("glyph ramp needs at least 2 glyphs, got {0}")]
    TooShort(usize),
}

/// Ordered glyph sequence of increasing visual density.
///
/// The ramp length is the quantization level count. Artifacts are only
/// interpretable together with the ramp that produced them, so the ramp is
/// fingerprinted into every manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Build a ramp from a glyph string.
    pub fn new(glyphs: &str) -> Result<Self, RampError> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.len() < 2 {
            return Err(RampError::TooShort(glyphs.len()));
        }
        Ok(Self { glyphs })
    }

    /// Number of quantization levels.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; a ramp holds at least two glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// Glyph at a level index.
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index]
    }

    /// SHA-256 hex fingerprint of the glyphs and the invert flag.
    pub fn fingerprint(&self, invert: bool) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        hasher.update([invert as u8]);
        hex::encode(hasher.finalize())
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        RampPreset::default().ramp()
    }
}

impl fmt::Display for GlyphRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for glyph in &self.glyphs {
            write!(f, "{}", glyph)?;
        }
        Ok(())
    }
}
