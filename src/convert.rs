//! Re-render ascii artifacts from stored raster artifacts.
//!
//! Used after changing the ramp, polarity or resolution: no provider is
//! called, only the decode/quantize/map stages run again.

use crate::key::CombinationKey;
use crate::manifest::ConfigSnapshot;
use crate::render::RenderSettings;
use crate::store::{ArtifactStore, PersistenceError};

/// Outcome counts of a reconversion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertReport {
    /// Slugs whose ascii artifact was rewritten.
    pub converted: Vec<String>,
    /// Slugs whose raster could not be decoded, with the reason.
    pub failed: Vec<(String, String)>,
    /// Keys without a stored raster.
    pub missing: usize,
}

impl ConvertReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Re-render every key in `keys` that has a stored raster.
///
/// Decode failures are recorded per key. When the pass is clean and a
/// manifest exists, its rendering snapshot is updated to `snapshot` so the
/// next generate run accepts the new ramp.
pub fn reconvert(
    store: &dyn ArtifactStore,
    keys: &[CombinationKey],
    render: &RenderSettings,
    snapshot: &ConfigSnapshot,
) -> Result<ConvertReport, PersistenceError> {
    let mut report = ConvertReport::default();
    let total = keys.len();

    for (i, key) in keys.iter().enumerate() {
        let Some(image) = store.read_image(key)? else {
            log::debug!("[{}/{}] {}: no stored image", i + 1, total, key);
            report.missing += 1;
            continue;
        };

        match render.render_bytes(&image) {
            Ok(ascii) => {
                store.write_ascii(key, &ascii)?;
                log::info!("[{}/{}] {} converted", i + 1, total, key);
                report.converted.push(key.slug().to_string());
            }
            Err(e) => {
                log::error!("[{}/{}] {}: {}", i + 1, total, key, e);
                report.failed.push((key.slug().to_string(), e.to_string()));
            }
        }
    }

    if report.is_clean() {
        if let Some(mut manifest) = store.read_manifest()? {
            manifest.config.ramp = snapshot.ramp.clone();
            manifest.config.ramp_fingerprint = snapshot.ramp_fingerprint.clone();
            manifest.config.invert = snapshot.invert;
            manifest.config.ascii_width = snapshot.ascii_width;
            manifest.config.ascii_height = snapshot.ascii_height;
            store.write_manifest(&manifest)?;
        }
    } else {
        log::warn!(
            "{} images failed to convert; manifest left unchanged",
            report.failed.len()
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::render::RampPreset;
    use crate::store::DirectoryStore;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png(value: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([value, value, value]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn settings(preset: RampPreset) -> RenderSettings {
        RenderSettings {
            width: 4,
            height: 2,
            ramp: preset.ramp(),
            invert: false,
        }
    }

    fn snapshot(render: &RenderSettings) -> ConfigSnapshot {
        ConfigSnapshot {
            ramp: render.ramp.to_string(),
            ramp_fingerprint: render.ramp_fingerprint(),
            invert: render.invert,
            ascii_width: render.width,
            ascii_height: render.height,
            races: vec!["Elf".to_string()],
            classes: vec![],
            backend: "openai".to_string(),
        }
    }

    #[test]
    fn test_reconvert_rewrites_ascii() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new_initialized(temp.path().to_path_buf()).unwrap();
        let elf = CombinationKey::race("Elf");
        let dwarf = CombinationKey::race("Dwarf");
        store.write_artifacts(&elf, &png(255), "old").unwrap();

        let render = settings(RampPreset::Minimal);
        let report =
            reconvert(&store, &[elf.clone(), dwarf], &render, &snapshot(&render)).unwrap();

        assert_eq!(report.converted, vec!["elf".to_string()]);
        assert_eq!(report.missing, 1);
        assert!(report.is_clean());
        assert_eq!(store.read_ascii(&elf).unwrap().unwrap(), "####\n####");
    }

    #[test]
    fn test_reconvert_records_undecodable_images() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new_initialized(temp.path().to_path_buf()).unwrap();
        let key = CombinationKey::race("Gnome");
        store.write_artifacts(&key, b"not an image", "old").unwrap();

        let render = settings(RampPreset::Minimal);
        let report = reconvert(&store, &[key.clone()], &render, &snapshot(&render)).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "gnome");
        assert_eq!(store.read_ascii(&key).unwrap().unwrap(), "old");
    }

    #[test]
    fn test_reconvert_updates_manifest_snapshot() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new_initialized(temp.path().to_path_buf()).unwrap();
        let key = CombinationKey::race("Elf");
        store.write_artifacts(&key, &png(0), "old").unwrap();

        let before = settings(RampPreset::Standard);
        store
            .write_manifest(&Manifest::from_records(&[], snapshot(&before)))
            .unwrap();

        let after = settings(RampPreset::Blocks);
        reconvert(&store, &[key], &after, &snapshot(&after)).unwrap();

        let manifest = store.read_manifest().unwrap().unwrap();
        assert_eq!(manifest.config.ramp_fingerprint, after.ramp_fingerprint());
        assert_eq!(manifest.config.races, vec!["Elf".to_string()]);
    }
}
