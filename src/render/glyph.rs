//! Quantized brightness to glyph mapping.

use super::ramp::GlyphRamp;

/// Map a quantized brightness value to a ramp glyph.
///
/// Index is `floor(value / 256 * len)`, clamped to `[0, len - 1]`. With
/// `invert` the index is mirrored (`len - 1 - index`) so bright samples map
/// to sparse glyphs instead of dense ones.
pub fn map_glyph(value: f64, ramp: &GlyphRamp, invert: bool) -> char {
    ramp.glyph(glyph_index(value, ramp.len(), invert))
}

/// Ramp index for a quantized value.
pub fn glyph_index(value: f64, levels: usize, invert: bool) -> usize {
    let max = levels - 1;
    let raw = (value / 256.0 * levels as f64).floor();
    let idx = if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(max)
    };
    if invert {
        max - idx
    } else {
        idx
    }
}

/// Map a row-major grid of quantized values to text, one line per row.
///
/// Rows are joined with `'\n'` and there is no trailing newline.
pub fn map_to_text(values: &[f64], width: usize, ramp: &GlyphRamp, invert: bool) -> String {
    if width == 0 {
        return String::new();
    }
    values
        .chunks(width)
        .map(|row| {
            row.iter()
                .map(|&v| map_glyph(v, ramp, invert))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
