//! Image to ASCII rendering pipeline.
//!
//! Provider image bytes pass through these stages:
//!
//! 1. **Decode** - any supported image format, Lanczos resample to the
//!    target resolution, BT.601 grayscale
//! 2. **Quantize** - Floyd-Steinberg error diffusion to N levels, where N is
//!    the glyph ramp length
//! 3. **Map** - quantized brightness to a ramp glyph, optionally inverted
//!
//! Given the same raster and ramp the output text is byte-identical.

mod glyph;
mod quantize;
mod ramp;
mod raster;

pub use glyph::{glyph_index, map_glyph, map_to_text};
pub use quantize::quantize;
pub use ramp::{
    GlyphRamp, RampError, RampPreset, BLOCKS_RAMP, MINIMAL_RAMP, PORTRAIT_RAMP, STANDARD_RAMP,
};
pub use raster::{to_grayscale, DecodeError, RasterBuffer, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Resolution, ramp and polarity for one rendering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub ramp: GlyphRamp,
    pub invert: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            ramp: GlyphRamp::default(),
            invert: false,
        }
    }
}

impl RenderSettings {
    /// Render an already decoded raster to ASCII text.
    pub fn render_raster(&self, raster: &RasterBuffer) -> String {
        let quantized = quantize(raster, self.ramp.len());
        map_to_text(&quantized, raster.width() as usize, &self.ramp, self.invert)
    }

    /// Decode image bytes at the configured resolution and render them.
    pub fn render_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let raster = RasterBuffer::decode(bytes, self.width, self.height)?;
        Ok(self.render_raster(&raster))
    }

    /// Fingerprint of the ramp and polarity used by these settings.
    pub fn ramp_fingerprint(&self) -> String {
        self.ramp.fingerprint(self.invert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_raster_dimensions() {
        let settings = RenderSettings {
            width: 3,
            height: 2,
            ramp: RampPreset::Minimal.ramp(),
            invert: false,
        };
        let raster = RasterBuffer::from_samples(3, 2, vec![0, 128, 255, 255, 128, 0]).unwrap();
        let text = settings.render_raster(&raster);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.chars().count() == 3));
    }

    #[test]
    fn test_one_by_one_renders_single_glyph() {
        let settings = RenderSettings {
            width: 1,
            height: 1,
            ramp: RampPreset::Minimal.ramp(),
            invert: false,
        };
        let raster = RasterBuffer::from_samples(1, 1, vec![200]).unwrap();
        // 200 * 3 / 255 = 2.35 -> 2 -> 170; 170 / 256 * 4 = 2.66 -> ':'
        assert_eq!(settings.render_raster(&raster), ":");
    }

    #[test]
    fn test_default_settings() {
        let settings = RenderSettings::default();
        assert_eq!((settings.width, settings.height), (160, 80));
        assert_eq!(settings.ramp.len(), 69);
        assert!(!settings.invert);
    }
}
