//! Artifact storage for rendered portraits.
//!
//! The orchestrator talks to an [`ArtifactStore`]; [`DirectoryStore`] is the
//! local-disk implementation:
//!
//! ```text
//! <root>/images/<slug>.png
//! <root>/ascii/<slug>.txt
//! <root>/manifest.json
//! ```

use std::path::{Path, PathBuf};

use crate::key::CombinationKey;
use crate::manifest::Manifest;

/// Manifest file name inside the store root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors raised while reading or writing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest '{}' is corrupt: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Sink for per-key artifacts and the run manifest.
///
/// Artifact pairs must be written completely or not at all.
pub trait ArtifactStore: Send + Sync {
    /// Whether both the raster and the ascii artifact exist for `key`.
    fn has_artifacts(&self, key: &CombinationKey) -> bool;

    /// Reference (path or URI) of the raster artifact for `key`.
    fn image_ref(&self, key: &CombinationKey) -> String;

    /// Reference (path or URI) of the ascii artifact for `key`.
    fn ascii_ref(&self, key: &CombinationKey) -> String;

    /// Persist both artifacts for `key`.
    fn write_artifacts(
        &self,
        key: &CombinationKey,
        image: &[u8],
        ascii: &str,
    ) -> Result<(), PersistenceError>;

    /// Replace only the ascii artifact for `key`.
    fn write_ascii(&self, key: &CombinationKey, ascii: &str) -> Result<(), PersistenceError>;

    fn read_image(&self, key: &CombinationKey) -> Result<Option<Vec<u8>>, PersistenceError>;

    fn read_ascii(&self, key: &CombinationKey) -> Result<Option<String>, PersistenceError>;

    fn write_manifest(&self, manifest: &Manifest) -> Result<(), PersistenceError>;

    fn read_manifest(&self) -> Result<Option<Manifest>, PersistenceError>;
}

/// Artifact store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create a store at `root`. Does not create any directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create a store at `root` and make sure its directories exist.
    pub fn new_initialized(root: PathBuf) -> Result<Self, PersistenceError> {
        let store = Self::new(root);
        store.ensure_dirs()?;
        Ok(store)
    }

    /// Default output root: `<data dir>/portrait-forge/generated_portraits`.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("portrait-forge")
            .join("generated_portraits")
    }

    pub fn ensure_dirs(&self) -> Result<(), PersistenceError> {
        for dir in [self.images_dir(), self.ascii_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::Write {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn ascii_dir(&self) -> PathBuf {
        self.root.join("ascii")
    }

    pub fn image_path(&self, key: &CombinationKey) -> PathBuf {
        self.images_dir().join(format!("{}.png", key.slug()))
    }

    pub fn ascii_path(&self, key: &CombinationKey) -> PathBuf {
        self.ascii_dir().join(format!("{}.txt", key.slug()))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

/// Write through a sibling temp file and rename into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let wrap = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents).map_err(wrap)?;
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        wrap(source)
    })
}

/// Read a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl ArtifactStore for DirectoryStore {
    fn has_artifacts(&self, key: &CombinationKey) -> bool {
        self.image_path(key).is_file() && self.ascii_path(key).is_file()
    }

    fn image_ref(&self, key: &CombinationKey) -> String {
        self.image_path(key).display().to_string()
    }

    fn ascii_ref(&self, key: &CombinationKey) -> String {
        self.ascii_path(key).display().to_string()
    }

    fn write_artifacts(
        &self,
        key: &CombinationKey,
        image: &[u8],
        ascii: &str,
    ) -> Result<(), PersistenceError> {
        let image_path = self.image_path(key);
        write_atomic(&image_path, image)?;
        if let Err(e) = write_atomic(&self.ascii_path(key), ascii.as_bytes()) {
            // Keep the pair all-or-nothing.
            let _ = std::fs::remove_file(&image_path);
            return Err(e);
        }
        log::debug!("Saved artifacts for {} under {}", key, self.root.display());
        Ok(())
    }

    fn write_ascii(&self, key: &CombinationKey, ascii: &str) -> Result<(), PersistenceError> {
        write_atomic(&self.ascii_path(key), ascii.as_bytes())
    }

    fn read_image(&self, key: &CombinationKey) -> Result<Option<Vec<u8>>, PersistenceError> {
        read_optional(&self.image_path(key))
    }

    fn read_ascii(&self, key: &CombinationKey) -> Result<Option<String>, PersistenceError> {
        let path = self.ascii_path(key);
        match read_optional(&path)? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| PersistenceError::Read {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            }),
            None => Ok(None),
        }
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<(), PersistenceError> {
        let path = self.manifest_path();
        let json = serde_json::to_vec_pretty(manifest).map_err(|source| {
            PersistenceError::Encode {
                path: path.clone(),
                source,
            }
        })?;
        write_atomic(&path, &json)
    }

    fn read_manifest(&self) -> Result<Option<Manifest>, PersistenceError> {
        let path = self.manifest_path();
        match read_optional(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| PersistenceError::Manifest { path, source }),
            None => Ok(None),
        }
    }
}
