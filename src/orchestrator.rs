//! Batch orchestration of portrait generation.
//!
//! Every key in the race / race×class universe moves from `pending` to exactly
//! one of `succeeded`, `failed` or `skipped`. Provider and decode failures are
//! recorded per key and never stop the run; persistence failures abort it.
//! The manifest is written once, after the last key, and is the run's commit
//! point.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::key::{enumerate_keys, CombinationKey};
use crate::manifest::{ConfigSnapshot, GenerationRecord, Manifest, Outcome, RunStats};
use crate::prompt;
use crate::provider::ImageProvider;
use crate::render::RenderSettings;
use crate::store::{ArtifactStore, PersistenceError};

/// Shared flag for cooperative cancellation, checked between keys.
pub type CancelFlag = Arc<AtomicBool>;

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("run cancelled after {processed} keys; no manifest written")]
    Cancelled { processed: usize },

    #[error(
        "existing artifacts were rendered with a different ramp or resolution \
         (manifest {previous}, current {current}); regenerate every key with --force \
         (without --only) or use `convert`"
    )]
    RenderConfigChanged { previous: String, current: String },
}

/// Inputs for one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub races: Vec<String>,
    pub classes: Vec<String>,
    pub render: RenderSettings,
    /// Regenerate keys whose artifacts already exist.
    pub force: bool,
    /// Restrict processing to these slugs.
    pub only: Option<BTreeSet<String>>,
    /// Delay after each non-skipped key.
    pub pacing: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            races: prompt::default_races(),
            classes: prompt::default_classes(),
            render: RenderSettings::default(),
            force: false,
            only: None,
            pacing: Duration::from_secs(5),
        }
    }
}

impl RunConfig {
    /// The full key universe, races first.
    pub fn universe(&self) -> Vec<CombinationKey> {
        enumerate_keys(&self.races, &self.classes)
    }

    /// The keys this run processes (the universe, narrowed by `only`).
    pub fn selected_keys(&self) -> Vec<CombinationKey> {
        let universe = self.universe();
        match &self.only {
            None => universe,
            Some(only) => {
                for slug in only {
                    if !universe.iter().any(|k| k.slug() == slug) {
                        log::warn!("Ignoring unknown key '{}'", slug);
                    }
                }
                universe
                    .into_iter()
                    .filter(|k| only.contains(k.slug()))
                    .collect()
            }
        }
    }

    /// Snapshot of the rendering and roster config for the manifest.
    pub fn snapshot(&self, backend: &str) -> ConfigSnapshot {
        ConfigSnapshot {
            ramp: self.render.ramp.to_string(),
            ramp_fingerprint: self.render.ramp_fingerprint(),
            invert: self.render.invert,
            ascii_width: self.render.width,
            ascii_height: self.render.height,
            races: self.races.clone(),
            classes: self.classes.clone(),
            backend: backend.to_string(),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub manifest: Manifest,
    pub records: Vec<GenerationRecord>,
}

impl RunReport {
    pub fn stats(&self) -> RunStats {
        self.manifest.stats
    }

    /// Records that ended in `failed`, in processing order.
    pub fn failures(&self) -> impl Iterator<Item = &GenerationRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == Outcome::Failed)
    }

    pub fn failed_keys(&self) -> Vec<String> {
        self.failures().map(|r| r.key.slug().to_string()).collect()
    }
}

/// Drives prompt building, generation, rendering and persistence per key.
pub struct PortraitOrchestrator<'a> {
    provider: &'a dyn ImageProvider,
    store: &'a dyn ArtifactStore,
    config: RunConfig,
    cancel: CancelFlag,
}

impl<'a> PortraitOrchestrator<'a> {
    pub fn new(
        provider: &'a dyn ImageProvider,
        store: &'a dyn ArtifactStore,
        config: RunConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned cancellation flag (e.g. set by Ctrl+C).
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process every selected key, then write the manifest.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let keys = self.config.selected_keys();
        let snapshot = self.config.snapshot(self.provider.name());
        self.check_render_config(&snapshot)?;

        let total = keys.len();
        log::info!(
            "Generating {} portraits with {} (force: {})",
            total,
            self.provider.name(),
            self.config.force
        );

        let mut records = Vec::with_capacity(total);
        for (i, key) in keys.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                log::warn!("Cancelled before {}; {} of {} keys processed", key, i, total);
                return Err(RunError::Cancelled { processed: i });
            }

            log::info!("[{}/{}] {}", i + 1, total, key.title());
            let record = self.process_key(key).await?;
            let paced = record.outcome != Outcome::Skipped;
            records.push(record);

            if paced && i + 1 < total && !self.config.pacing.is_zero() {
                log::debug!("Pacing for {:?}", self.config.pacing);
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        let manifest = Manifest::from_records(&records, snapshot);
        self.store.write_manifest(&manifest)?;
        log::info!(
            "Run complete: {} succeeded, {} skipped, {} failed",
            manifest.stats.successful,
            manifest.stats.skipped,
            manifest.stats.failed
        );

        Ok(RunReport { manifest, records })
    }

    /// Take one key from `pending` to a terminal outcome.
    ///
    /// Only persistence failures are returned as errors.
    pub async fn process_key(
        &self,
        key: &CombinationKey,
    ) -> Result<GenerationRecord, PersistenceError> {
        let record = GenerationRecord::pending(key.clone());

        if !self.config.force && self.store.has_artifacts(key) {
            log::info!("  {} already exists, skipping", key);
            return Ok(record.skip(self.store.image_ref(key), self.store.ascii_ref(key)));
        }

        let prompt = match prompt::build(key.race_name(), key.class_name()) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("  {}: prompt build failed: {}", key, e);
                return Ok(record.fail(e.to_string()));
            }
        };
        log::debug!("  prompt: {}", prompt);

        let image = match self.provider.generate(&prompt).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("  {}: generation failed: {}", key, e);
                return Ok(record.fail(e.to_string()));
            }
        };

        let ascii = match self.config.render.render_bytes(&image) {
            Ok(text) => text,
            Err(e) => {
                log::error!("  {}: could not decode image: {}", key, e);
                return Ok(record.fail(e.to_string()));
            }
        };

        self.store.write_artifacts(key, &image, &ascii)?;
        log::info!("  {} generated", key);
        Ok(record.succeed(self.store.image_ref(key), self.store.ascii_ref(key)))
    }

    /// Refuse to mix renderings: existing artifacts must have been produced
    /// with the same ramp and resolution unless the run regenerates all of them.
    ///
    /// A forced run narrowed by `only` leaves the other keys' ascii untouched,
    /// so it is held to the same check as an unforced run.
    fn check_render_config(&self, current: &ConfigSnapshot) -> Result<(), RunError> {
        if self.config.force && self.config.only.is_none() {
            return Ok(());
        }
        match self.store.read_manifest()? {
            Some(previous) if !previous.config.same_rendering(current) => {
                Err(RunError::RenderConfigChanged {
                    previous: format!(
                        "{}x{} ramp {}",
                        previous.config.ascii_width,
                        previous.config.ascii_height,
                        short_fingerprint(&previous.config.ramp_fingerprint)
                    ),
                    current: format!(
                        "{}x{} ramp {}",
                        current.ascii_width,
                        current.ascii_height,
                        short_fingerprint(&current.ramp_fingerprint)
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}

fn short_fingerprint(fingerprint: &str) -> &str {
    &fingerprint[..fingerprint.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_keys_respects_only() {
        let config = RunConfig {
            races: vec!["Elf".to_string(), "Dwarf".to_string()],
            classes: vec!["Bard".to_string()],
            only: Some(["dwarf-bard".to_string(), "nope".to_string()].into()),
            ..RunConfig::default()
        };
        let slugs: Vec<String> = config
            .selected_keys()
            .iter()
            .map(|k| k.slug().to_string())
            .collect();
        assert_eq!(slugs, vec!["dwarf-bard"]);
    }

    #[test]
    fn test_default_universe_size() {
        // 9 races + 9 * 12 combinations
        assert_eq!(RunConfig::default().universe().len(), 117);
    }

    #[test]
    fn test_snapshot_records_render_config() {
        let config = RunConfig::default();
        let snap = config.snapshot("openai");
        assert_eq!(snap.ascii_width, 160);
        assert_eq!(snap.ascii_height, 80);
        assert_eq!(snap.ramp, config.render.ramp.to_string());
        assert_eq!(snap.ramp_fingerprint, config.render.ramp_fingerprint());
        assert_eq!(snap.backend, "openai");
    }

    #[test]
    fn test_short_fingerprint() {
        assert_eq!(short_fingerprint("abcdef0123456789"), "abcdef012345");
        assert_eq!(short_fingerprint("abc"), "abc");
    }
}
