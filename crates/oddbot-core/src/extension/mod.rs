//! Extension system for OddBot.
//!
//! Extensions are optional units of bot functionality that can be brought in
//! and out of the running process. Each one lives in its own subdirectory of
//! the extensions root and is marked by an entry-point file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ExtensionRegistry              │
//! │  - Discovers extension directories          │
//! │  - Resolves logical names to descriptors    │
//! │  - Tracks Discovered/Loaded/Unloaded        │
//! └─────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌──────────────────┐
//!              │   ModuleLoader   │  (host capability)
//!              └──────────────────┘
//!                        │
//!                        ▼
//!              ┌──────────────────┐
//!              │  FactoryLoader   │  name -> constructor
//!              └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oddbot_core::extension::{ExtensionRegistry, FactoryLoader};
//!
//! let loader = Arc::new(FactoryLoader::new().with_factory("SillyID", make_silly_id));
//! let registry = ExtensionRegistry::new(loader.clone());
//!
//! registry.discover(Path::new("extensions")).await?;
//! registry.load("SillyID").await?;
//! loader.dispatch("ckusr", &args).await?;
//! ```

pub mod loader;
pub mod registry;
pub mod types;

pub use loader::{ExtensionFactory, FactoryLoader, ModuleLoader};
pub use registry::{ExtensionInfo, ExtensionRegistry, StartupReport};
pub use types::{
    BoxError, DynExtension, Extension, ExtensionDescriptor, ExtensionError, ExtensionManifest,
    ExtensionState, Result,
};
