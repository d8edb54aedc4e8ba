//! Core traits and types for OddBot.
//!
//! This crate defines the host-facing abstractions shared by the bot's crates:
//! the extension registry, the capabilities the host hands to extensions, and
//! the configuration every crate reads its defaults from.

pub mod config;
pub mod error;
pub mod extension;
pub mod host;

pub use config::{BotConfig, StartupPolicy};
pub use error::{Error, Result};
pub use host::{ConsoleNotifier, Embed, EmbedAuthor, EmbedField, MemoryNotifier, Notifier, UserRef};

/// Re-exports commonly used types.
pub mod prelude {
    // Configuration
    pub use crate::config::{defaults, env_vars, BotConfig, StartupPolicy};

    // Error handling
    pub use crate::error::{Error, Result};

    // Host capabilities
    pub use crate::host::{
        ConsoleNotifier, DynNotifier, Embed, EmbedAuthor, EmbedField, HostContext,
        MemoryNotifier, Notifier, UserRef,
    };

    // Extension system
    pub use crate::extension::{
        BoxError, DynExtension, Extension, ExtensionDescriptor, ExtensionError,
        ExtensionFactory, ExtensionInfo, ExtensionManifest, ExtensionRegistry, ExtensionState,
        FactoryLoader, ModuleLoader, StartupReport,
    };
}
