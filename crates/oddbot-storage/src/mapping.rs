//! Mapping store: `external id -> silly id`, persisted as pretty JSON.
//!
//! Keys are the external ids as decimal strings since they do not fit the
//! silly id width. The file is replaced as a whole on every save by writing a
//! sibling temp file and renaming it over the old one.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// In-memory form of the store.
pub type Mapping = BTreeMap<String, u32>;

/// Somewhere a mapping can be loaded from and saved to.
pub trait MappingBackend: Send {
    /// Read the full mapping, initializing an empty one if none exists yet.
    fn load(&self) -> Result<Mapping>;

    /// Replace the stored mapping with `mapping`.
    fn save(&self, mapping: &Mapping) -> Result<()>;

    /// Where the data lives, for log and error messages.
    fn location(&self) -> &Path;
}

/// File-backed mapping store.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the mapping from disk.
    ///
    /// A missing file is expected on first start: an empty mapping is written
    /// and returned. A file that exists but does not parse is reported as
    /// [`Error::Corrupt`] and left untouched.
    pub fn load(&self) -> Result<Mapping> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(category = "storage", path = %self.path.display(), "Unable to locate silly id database");
                info!(category = "storage", path = %self.path.display(), "Creating empty silly id database");
                let mapping = Mapping::new();
                self.save(&mapping)?;
                return Ok(mapping);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let mapping: Mapping = serde_json::from_str(&content).map_err(|e| {
            error!(category = "storage", path = %self.path.display(), error = %e, "Silly id database is corrupt");
            Error::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!(category = "storage", path = %self.path.display(), entries = mapping.len(), "Loaded silly id database");
        Ok(mapping)
    }

    /// Write the full mapping, replacing the previous file.
    pub fn save(&self, mapping: &Mapping) -> Result<()> {
        let json = serde_json::to_string_pretty(mapping)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::Io(e));
        }

        debug!(category = "storage", path = %self.path.display(), entries = mapping.len(), "Saved silly id database");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MappingBackend for MappingStore {
    fn load(&self) -> Result<Mapping> {
        MappingStore::load(self)
    }

    fn save(&self, mapping: &Mapping) -> Result<()> {
        MappingStore::save(self, mapping)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
