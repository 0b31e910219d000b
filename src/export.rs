//! Escape-safe export of rendered portraits.
//!
//! Ascii art is full of backslashes, quotes and (with block ramps) multi-byte
//! glyphs, so every artifact is base64-encoded before it is embedded in a
//! JavaScript module or JSON document.

use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::CombinationKey;
use crate::store::{write_atomic, ArtifactStore, PersistenceError};

/// Default JavaScript module file name.
pub const JS_EXPORT_FILE: &str = "portraits.js";

/// Default JSON export file name.
pub const JSON_EXPORT_FILE: &str = "portraits.json";

/// Errors decoding an exported entry.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded text is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode ascii text as standard base64 over its UTF-8 bytes.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Inverse of [`encode`].
pub fn decode(encoded: &str) -> Result<String, ExportError> {
    Ok(String::from_utf8(STANDARD.decode(encoded)?)?)
}

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    JavaScript,
    Json,
}

impl ExportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::JavaScript => JS_EXPORT_FILE,
            ExportFormat::Json => JSON_EXPORT_FILE,
        }
    }
}

/// Base64-encoded portraits keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortraitExport {
    pub generated_at: DateTime<Utc>,
    pub races: BTreeMap<String, String>,
    pub race_class: BTreeMap<String, String>,
}

impl PortraitExport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            races: BTreeMap::new(),
            race_class: BTreeMap::new(),
        }
    }

    /// Collect every stored ascii artifact for `keys`. Missing ones are skipped.
    pub fn from_store(
        store: &dyn ArtifactStore,
        keys: &[CombinationKey],
    ) -> Result<Self, PersistenceError> {
        let mut export = Self::new();
        for key in keys {
            if let Some(text) = store.read_ascii(key)? {
                export.insert(key, &text);
            }
        }
        log::info!("Exporting {} portraits", export.len());
        Ok(export)
    }

    pub fn insert(&mut self, key: &CombinationKey, text: &str) {
        let map = if key.has_class() {
            &mut self.race_class
        } else {
            &mut self.races
        };
        map.insert(key.slug().to_string(), encode(text));
    }

    pub fn len(&self) -> usize {
        self.races.len() + self.race_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Portrait for `race`/`class`, falling back to the race-only portrait.
    ///
    /// Lookup is case-insensitive. Entries that fail to decode are treated
    /// as missing.
    pub fn get_portrait(&self, race: &str, class: Option<&str>) -> Option<String> {
        let by_class = class.and_then(|class| {
            let key = CombinationKey::race_class(race, class);
            self.race_class.get(key.slug())
        });
        let encoded = by_class.or_else(|| self.races.get(CombinationKey::race(race).slug()))?;
        match decode(encoded) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Corrupt export entry for {}: {}", race, e);
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render an ES module exposing `PORTRAITS` and `getPortrait`.
    pub fn to_js_module(&self) -> String {
        let mut js = String::new();
        js.push_str("// Generated D&D character portraits\n");
        js.push_str(&format!(
            "// Generated at: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        js.push_str("// Ascii art is base64-encoded UTF-8\n\n");

        js.push_str(
            "function decodeAscii(base64) {\n  \
               try {\n    \
                 const bytes = Uint8Array.from(atob(base64), (c) => c.charCodeAt(0));\n    \
                 return new TextDecoder('utf-8').decode(bytes);\n  \
               } catch (e) {\n    \
                 console.error('Failed to decode ASCII art:', e);\n    \
                 return '';\n  \
               }\n\
             }\n\n",
        );

        js.push_str("const PORTRAITS_DATA = {\n");
        js.push_str("  races: {\n");
        write_js_entries(&mut js, &self.races);
        js.push_str("  },\n");
        js.push_str("  raceClass: {\n");
        write_js_entries(&mut js, &self.race_class);
        js.push_str("  },\n");
        js.push_str("};\n\n");

        js.push_str(
            "export const PORTRAITS = {\n  \
               races: Object.fromEntries(\n    \
                 Object.entries(PORTRAITS_DATA.races).map(([k, v]) => [k, decodeAscii(v)])\n  \
               ),\n  \
               raceClass: Object.fromEntries(\n    \
                 Object.entries(PORTRAITS_DATA.raceClass).map(([k, v]) => [k, decodeAscii(v)])\n  \
               ),\n\
             };\n\n",
        );

        js.push_str(
            "function slug(name) {\n  \
               return name.trim().toLowerCase().split(/\\s+/).join('-');\n\
             }\n\n",
        );

        js.push_str(
            "export function getPortrait(race, className = null) {\n  \
               if (className) {\n    \
                 const combined = PORTRAITS.raceClass[`${slug(race)}-${slug(className)}`];\n    \
                 if (combined) return combined;\n  \
               }\n  \
               return PORTRAITS.races[slug(race)] || null;\n\
             }\n",
        );
        js
    }

    /// Write the export into `dir` and return the file path.
    pub fn save(
        &self,
        dir: &Path,
        format: ExportFormat,
    ) -> Result<std::path::PathBuf, PersistenceError> {
        let path = dir.join(format.file_name());
        let contents = match format {
            ExportFormat::JavaScript => self.to_js_module(),
            ExportFormat::Json => self.to_json().map_err(|source| PersistenceError::Encode {
                path: path.clone(),
                source,
            })?,
        };
        write_atomic(&path, contents.as_bytes())?;
        log::info!("Wrote {}", path.display());
        Ok(path)
    }
}

impl Default for PortraitExport {
    fn default() -> Self {
        Self::new()
    }
}

fn write_js_entries(js: &mut String, entries: &BTreeMap<String, String>) {
    for (slug, encoded) in entries {
        // serde_json string literals are valid JS string literals
        let key = serde_json::Value::String(slug.clone());
        js.push_str(&format!("    {}: '{}',\n", key, encoded));
    }
}
