//! Extension registry.
//!
//! The registry provides:
//! - Discovery of extension directories under a root
//! - Name to descriptor resolution
//! - Load/unload/reload bookkeeping, delegated to a [`ModuleLoader`]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::loader::ModuleLoader;
use super::types::{
    ExtensionDescriptor, ExtensionError, ExtensionManifest, ExtensionState, Result,
};
use crate::config::{defaults, StartupPolicy};

/// Information about a discovered extension.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub descriptor: ExtensionDescriptor,
    pub state: ExtensionState,
    /// When the extension last became loaded.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Outcome of loading the startup list under [`StartupPolicy::Continue`].
#[derive(Debug, Default)]
pub struct StartupReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, ExtensionError)>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry for discovered extensions.
pub struct ExtensionRegistry {
    loader: Arc<dyn ModuleLoader>,
    /// Marker file a directory must contain to count as an extension.
    entry_point: String,
    /// Discovered extensions; also serializes every state transition.
    entries: Mutex<BTreeMap<String, ExtensionInfo>>,
}

impl ExtensionRegistry {
    /// Create a registry using the default entry-point file name.
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_entry_point(loader, defaults::ENTRY_POINT)
    }

    pub fn with_entry_point(loader: Arc<dyn ModuleLoader>, entry_point: impl Into<String>) -> Self {
        Self {
            loader,
            entry_point: entry_point.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Scan the immediate subdirectories of `root`.
    ///
    /// Every subdirectory holding the entry-point file becomes a descriptor
    /// named after the directory; anything else is skipped. The result
    /// replaces the previous descriptor set. Extensions still present keep
    /// their state.
    pub async fn discover(&self, root: &Path) -> Result<Vec<ExtensionDescriptor>> {
        let dir = std::fs::read_dir(root).map_err(|source| ExtensionError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;

        let mut found = BTreeMap::new();
        for entry in dir.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!(category = "extension", path = %path.display(), "Skipping non UTF-8 directory name");
                continue;
            };
            let descriptor = ExtensionDescriptor::new(root, name, &self.entry_point);
            if !descriptor.location.is_file() {
                debug!(category = "extension", dir = %path.display(), "No entry point, skipping");
                continue;
            }
            let manifest = read_manifest(&descriptor.location);
            found.insert(name.to_string(), descriptor.with_manifest(manifest));
        }

        let mut entries = self.entries.lock().await;
        for (name, info) in entries.iter() {
            if info.state == ExtensionState::Loaded && !found.contains_key(name) {
                warn!(category = "extension", extension = %name, "Loaded extension disappeared from disk");
            }
        }

        let previous = std::mem::take(&mut *entries);
        for (name, descriptor) in &found {
            let (state, loaded_at) = previous
                .get(name)
                .map(|info| (info.state, info.loaded_at))
                .unwrap_or((ExtensionState::Discovered, None));
            entries.insert(
                name.clone(),
                ExtensionInfo {
                    descriptor: descriptor.clone(),
                    state,
                    loaded_at,
                },
            );
        }

        info!(category = "extension", root = %root.display(), count = found.len(), "Discovered extensions");
        Ok(found.into_values().collect())
    }

    /// Load a discovered extension.
    pub async fn load(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let info = entries
            .get_mut(name)
            .ok_or_else(|| ExtensionError::Unknown(name.to_string()))?;

        let result = self.loader.load(&info.descriptor).await;
        if let Err(source) = result {
            self.sync_state(info).await;
            return Err(ExtensionError::Load {
                name: name.to_string(),
                source,
            });
        }

        info.state = ExtensionState::Loaded;
        info.loaded_at = Some(Utc::now());
        info!(category = "extension", extension = %name, "Loaded extension");
        Ok(())
    }

    /// Unload a discovered extension.
    pub async fn unload(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let info = entries
            .get_mut(name)
            .ok_or_else(|| ExtensionError::Unknown(name.to_string()))?;

        let result = self.loader.unload(&info.descriptor).await;
        if let Err(source) = result {
            self.sync_state(info).await;
            return Err(ExtensionError::Unload {
                name: name.to_string(),
                source,
            });
        }

        info.state = ExtensionState::Unloaded;
        info.loaded_at = None;
        info!(category = "extension", extension = %name, "Unloaded extension");
        Ok(())
    }

    /// Unload and load again as one transition.
    pub async fn reload(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let info = entries
            .get_mut(name)
            .ok_or_else(|| ExtensionError::Unknown(name.to_string()))?;

        let result = self.loader.reload(&info.descriptor).await;
        match result {
            Ok(()) => {
                info.state = ExtensionState::Loaded;
                info.loaded_at = Some(Utc::now());
                info!(category = "extension", extension = %name, "Reloaded extension");
                Ok(())
            }
            Err(source) => {
                self.sync_state(info).await;
                Err(ExtensionError::Reload {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Load `names` in order.
    ///
    /// With [`StartupPolicy::Abort`] the first failure is returned and the rest
    /// of the list is not attempted. With [`StartupPolicy::Continue`] every
    /// entry is attempted and failures are collected in the report.
    pub async fn load_startup<S: AsRef<str>>(
        &self,
        names: &[S],
        policy: StartupPolicy,
    ) -> Result<StartupReport> {
        let mut report = StartupReport::default();
        for name in names {
            let name = name.as_ref();
            match self.load(name).await {
                Ok(()) => report.loaded.push(name.to_string()),
                Err(e) => {
                    error!(category = "extension", extension = %name, error = %e, "Startup load failed");
                    if policy == StartupPolicy::Abort {
                        return Err(e);
                    }
                    report.failed.push((name.to_string(), e));
                }
            }
        }
        Ok(report)
    }

    /// Descriptors from the last discovery scan, sorted by name.
    pub async fn descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.entries
            .lock()
            .await
            .values()
            .map(|info| info.descriptor.clone())
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<ExtensionInfo> {
        self.entries.lock().await.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<ExtensionInfo> {
        self.entries.lock().await.values().cloned().collect()
    }

    pub async fn state(&self, name: &str) -> Option<ExtensionState> {
        self.entries.lock().await.get(name).map(|info| info.state)
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.state(name).await == Some(ExtensionState::Loaded)
    }

    /// Names of loaded extensions.
    pub async fn loaded(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .values()
            .filter(|info| info.state == ExtensionState::Loaded)
            .map(|info| info.descriptor.name.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.lock().await.contains_key(name)
    }

    /// After a failed transition, make the recorded state match what the
    /// loader actually has running.
    async fn sync_state(&self, info: &mut ExtensionInfo) {
        let active = self.loader.is_active(&info.descriptor.name).await;
        match (active, info.state) {
            (true, ExtensionState::Loaded)
            | (false, ExtensionState::Discovered)
            | (false, ExtensionState::Unloaded) => {}
            (true, _) => {
                info.state = ExtensionState::Loaded;
                info.loaded_at = Some(Utc::now());
            }
            (false, _) => {
                warn!(category = "extension", extension = %info.descriptor.name, "No live instance left after failed transition");
                info.state = ExtensionState::Unloaded;
                info.loaded_at = None;
            }
        }
    }
}

/// Read the entry-point file as a manifest. It only has to exist; unreadable
/// content yields an empty manifest.
fn read_manifest(path: &Path) -> ExtensionManifest {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(category = "extension", path = %path.display(), error = %e, "Cannot read entry point");
            return ExtensionManifest::default();
        }
    };
    toml::from_str(&content).unwrap_or_else(|e| {
        warn!(category = "extension", path = %path.display(), error = %e, "Entry point is not a valid manifest");
        ExtensionManifest::default()
    })
}
