//! Extension type definitions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type reported by host-side capabilities and extension hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, ExtensionError>;

/// Extension lifecycle errors.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The name was not found by the last discovery scan.
    #[error("Unknown extension: {0}")]
    Unknown(String),

    #[error("Failed to load extension {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to unload extension {name}: {source}")]
    Unload {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to reload extension {name}: {source}")]
    Reload {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Extension already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("Extension not loaded: {0}")]
    NotLoaded(String),

    /// The loader has no way to instantiate this name.
    #[error("No factory registered for extension: {0}")]
    NoFactory(String),

    /// The extensions root could not be scanned.
    #[error("Cannot scan extension directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command handler failed.
    #[error("Extension {name} failed to handle command: {source}")]
    Command {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The extension hit a terminal condition and refuses further work.
    #[error("Extension {name} is disabled: {reason}")]
    Disabled { name: String, reason: String },
}

/// Lifecycle state of a discovered extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    /// Found on disk, never loaded.
    Discovered,
    Loaded,
    Unloaded,
}

impl std::fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionState::Discovered => write!(f, "discovered"),
            ExtensionState::Loaded => write!(f, "loaded"),
            ExtensionState::Unloaded => write!(f, "unloaded"),
        }
    }
}

/// Optional contents of an extension's entry-point file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionManifest {
    pub description: Option<String>,
    pub version: Option<String>,
}

/// A discoverable extension: its logical name and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    /// Name of the subdirectory the extension lives in.
    pub name: String,
    /// Path of the entry-point file.
    pub location: PathBuf,
    pub manifest: ExtensionManifest,
}

impl ExtensionDescriptor {
    /// Build the descriptor for `<root>/<name>/<entry_point>`.
    pub fn new(root: &Path, name: impl Into<String>, entry_point: &str) -> Self {
        let name = name.into();
        let location = root.join(&name).join(entry_point);
        Self {
            name,
            location,
            manifest: ExtensionManifest::default(),
        }
    }

    pub fn with_manifest(mut self, manifest: ExtensionManifest) -> Self {
        self.manifest = manifest;
        self
    }
}

/// A unit of functionality the host can load and unload at runtime.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Logical name; matches the descriptor it was created from.
    fn name(&self) -> &str;

    /// Called once after construction, before the extension receives commands.
    async fn on_load(&mut self) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Called once before the extension is dropped.
    async fn on_unload(&mut self) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Handle a chat command. Returns `Ok(false)` if the command is not ours.
    async fn handle_command(&self, _command: &str, _args: &[String]) -> Result<bool> {
        Ok(false)
    }
}

pub type DynExtension = Box<dyn Extension>;
