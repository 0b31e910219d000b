//! Floyd-Steinberg error-diffusion quantizer.

use super::raster::RasterBuffer;

/// Quantize a raster to `levels` evenly spaced brightness values using
/// Floyd-Steinberg error diffusion.
///
/// Pixels are visited row-major, top-to-bottom and left-to-right, over an
/// `f64` accumulator seeded from the samples. Each pixel's rounding residual
/// is pushed to its unvisited neighbors:
///
/// ```text
///          [*]  7/16
///   3/16  5/16  1/16
/// ```
///
/// Neighbors outside the raster are skipped and their share of the residual
/// is dropped, not redistributed. Edge pixels therefore receive less
/// correction than interior ones; output for previously rendered artifacts
/// depends on this.
///
/// Rounding is half-to-even.
///
/// Returns one quantized value per sample, in row-major order.
pub fn quantize(raster: &RasterBuffer, levels: usize) -> Vec<f64> {
    assert!(levels >= 2, "quantizer needs at least 2 levels");

    let w = raster.width() as usize;
    let h = raster.height() as usize;
    let steps = (levels - 1) as f64;
    let step_size = 255.0 / steps;

    let mut buffer: Vec<f64> = raster.samples().iter().map(|&s| s as f64).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old_val = buffer[idx];
            let new_val = (old_val * steps / 255.0).round_ties_even() * step_size;
            buffer[idx] = new_val;

            let error = old_val - new_val;

            // Right: 7/16
            if x + 1 < w {
                buffer[idx + 1] += error * 7.0 / 16.0;
            }
            if y + 1 < h {
                // Bottom-left: 3/16
                if x > 0 {
                    buffer[idx + w - 1] += error * 3.0 / 16.0;
                }
                // Bottom: 5/16
                buffer[idx + w] += error * 5.0 / 16.0;
                // Bottom-right: 1/16
                if x + 1 < w {
                    buffer[idx + w + 1] += error / 16.0;
                }
            }
        }
    }

    buffer
}
