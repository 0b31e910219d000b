//! Run manifest: stats, per-key outcomes and the render config snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::CombinationKey;

/// Lifecycle of one key within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// The record of one key's processing within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub key: CombinationKey,
    pub outcome: Outcome,
    pub image_ref: Option<String>,
    pub ascii_ref: Option<String>,
    pub error: Option<String>,
}

impl GenerationRecord {
    /// A fresh record in the `pending` state.
    pub fn pending(key: CombinationKey) -> Self {
        Self {
            key,
            outcome: Outcome::Pending,
            image_ref: None,
            ascii_ref: None,
            error: None,
        }
    }

    /// Move to `succeeded`. Panics if the record already left `pending`.
    pub fn succeed(mut self, image_ref: String, ascii_ref: String) -> Self {
        self.transition(Outcome::Succeeded);
        self.image_ref = Some(image_ref);
        self.ascii_ref = Some(ascii_ref);
        self
    }

    /// Move to `skipped`, pointing at the artifacts already on disk.
    pub fn skip(mut self, image_ref: String, ascii_ref: String) -> Self {
        self.transition(Outcome::Skipped);
        self.image_ref = Some(image_ref);
        self.ascii_ref = Some(ascii_ref);
        self
    }

    /// Move to `failed` with an error message.
    pub fn fail(mut self, error: String) -> Self {
        self.transition(Outcome::Failed);
        self.error = Some(error);
        self
    }

    fn transition(&mut self, to: Outcome) {
        assert_eq!(
            self.outcome,
            Outcome::Pending,
            "{} already reached a terminal outcome",
            self.key
        );
        self.outcome = to;
    }

    /// This record's contribution to the run stats.
    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats {
            total: 1,
            ..RunStats::default()
        };
        match self.outcome {
            Outcome::Succeeded => stats.successful = 1,
            Outcome::Failed => stats.failed = 1,
            Outcome::Skipped => stats.skipped = 1,
            Outcome::Pending => {}
        }
        stats
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunStats {
    /// Combine two partial aggregates.
    pub fn merge(self, other: RunStats) -> RunStats {
        RunStats {
            total: self.total + other.total,
            successful: self.successful + other.successful,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }

    /// Fold the stats of a set of records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a GenerationRecord>) -> Self {
        records
            .into_iter()
            .map(GenerationRecord::stats)
            .fold(RunStats::default(), RunStats::merge)
    }

    /// Percentage of processed keys that were generated successfully.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64 * 100.0
        }
    }
}

/// Per-key outcomes, split into race-only and race×class maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMap {
    pub races: BTreeMap<String, Outcome>,
    pub race_class: BTreeMap<String, Outcome>,
}

impl OutcomeMap {
    pub fn insert(&mut self, key: &CombinationKey, outcome: Outcome) {
        let map = if key.has_class() {
            &mut self.race_class
        } else {
            &mut self.races
        };
        map.insert(key.slug().to_string(), outcome);
    }

    pub fn get(&self, slug: &str) -> Option<Outcome> {
        self.races
            .get(slug)
            .or_else(|| self.race_class.get(slug))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.races.len() + self.race_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact rendering and roster configuration used for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub ramp: String,
    pub ramp_fingerprint: String,
    pub invert: bool,
    pub ascii_width: u32,
    pub ascii_height: u32,
    pub races: Vec<String>,
    pub classes: Vec<String>,
    pub backend: String,
}

impl ConfigSnapshot {
    /// True when artifacts rendered under `other` read the same as ours.
    pub fn same_rendering(&self, other: &ConfigSnapshot) -> bool {
        self.ramp_fingerprint == other.ramp_fingerprint
            && self.ascii_width == other.ascii_width
            && self.ascii_height == other.ascii_height
    }
}

/// Durable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub stats: RunStats,
    pub results: OutcomeMap,
    pub config: ConfigSnapshot,
}

impl Manifest {
    /// Assemble a manifest from the finished records of a run.
    pub fn from_records(records: &[GenerationRecord], config: ConfigSnapshot) -> Self {
        let mut results = OutcomeMap::default();
        for record in records {
            results.insert(&record.key, record.outcome);
        }
        Self {
            generated_at: Utc::now(),
            stats: RunStats::from_records(records),
            results,
            config,
        }
    }

    /// Slugs recorded as failed.
    pub fn failed_keys(&self) -> Vec<String> {
        self.results
            .races
            .iter()
            .chain(self.results.race_class.iter())
            .filter(|(_, outcome)| **outcome == Outcome::Failed)
            .map(|(slug, _)| slug.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            ramp: " .:#".to_string(),
            ramp_fingerprint: "abc".to_string(),
            invert: false,
            ascii_width: 160,
            ascii_height: 80,
            races: vec!["Elf".to_string()],
            classes: vec!["Bard".to_string()],
            backend: "openai".to_string(),
        }
    }

    #[test]
    fn test_record_transitions_once() {
        let record = GenerationRecord::pending(CombinationKey::race("Elf"))
            .succeed("images/elf.png".to_string(), "ascii/elf.txt".to_string());
        assert_eq!(record.outcome, Outcome::Succeeded);
        assert!(record.outcome.is_terminal());
    }

    #[test]
    #[should_panic(expected = "already reached a terminal outcome")]
    fn test_second_transition_panics() {
        let _ = GenerationRecord::pending(CombinationKey::race("Elf"))
            .fail("boom".to_string())
            .fail("again".to_string());
    }

    #[test]
    fn test_stats_fold() {
        let records = vec![
            GenerationRecord::pending(CombinationKey::race("Elf"))
                .succeed("i".to_string(), "a".to_string()),
            GenerationRecord::pending(CombinationKey::race("Dwarf"))
                .skip("i".to_string(), "a".to_string()),
            GenerationRecord::pending(CombinationKey::race_class("Elf", "Bard"))
                .fail("x".to_string()),
        ];
        let stats = RunStats::from_records(&records);
        assert_eq!(
            stats,
            RunStats {
                total: 3,
                successful: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert!((stats.success_rate() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_manifest_json_shape() {
        let records = vec![
            GenerationRecord::pending(CombinationKey::race("Elf"))
                .succeed("i".to_string(), "a".to_string()),
            GenerationRecord::pending(CombinationKey::race_class("Elf", "Bard"))
                .fail("x".to_string()),
        ];
        let manifest = Manifest::from_records(&records, snapshot());
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["stats"]["total"], 2);
        assert_eq!(json["results"]["races"]["elf"], "succeeded");
        assert_eq!(json["results"]["race_class"]["elf-bard"], "failed");
        assert_eq!(json["config"]["ascii_width"], 160);
        assert_eq!(manifest.failed_keys(), vec!["elf-bard".to_string()]);
    }

    #[test]
    fn test_manifest_round_trips_through_json() {
        let manifest = Manifest::from_records(&[], snapshot());
        let text = serde_json::to_string_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_same_rendering_ignores_roster() {
        let a = snapshot();
        let mut b = snapshot();
        b.races.push("Gnome".to_string());
        assert!(a.same_rendering(&b));
        b.ramp_fingerprint = "other".to_string();
        assert!(!a.same_rendering(&b));
    }
}
