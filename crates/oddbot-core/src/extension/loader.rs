//! Module loaders: the host capability that actually brings extensions to life.
//!
//! The registry only tracks names and states; it hands every transition to a
//! [`ModuleLoader`]. [`FactoryLoader`] is the in-process implementation that
//! maps logical names to constructor closures.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::types::{BoxError, DynExtension, ExtensionDescriptor, ExtensionError, Result};

/// Loads, unloads and reloads extensions for the registry.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError>;

    async fn unload(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError>;

    async fn reload(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError> {
        self.unload(descriptor).await?;
        self.load(descriptor).await
    }

    /// Whether a live instance of `name` exists. The registry re-reads this
    /// after a failed transition.
    async fn is_active(&self, name: &str) -> bool;
}

/// Constructor for one extension.
pub type ExtensionFactory =
    Arc<dyn Fn(&ExtensionDescriptor) -> std::result::Result<DynExtension, BoxError> + Send + Sync>;

/// Loader backed by a table of factories.
pub struct FactoryLoader {
    factories: HashMap<String, ExtensionFactory>,
    /// Live instances, keyed by logical name.
    active: Mutex<BTreeMap<String, DynExtension>>,
}

impl FactoryLoader {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            active: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register the factory for `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ExtensionDescriptor) -> std::result::Result<DynExtension, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ExtensionDescriptor) -> std::result::Result<DynExtension, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of the currently live extensions.
    pub async fn active(&self) -> Vec<String> {
        self.active.lock().await.keys().cloned().collect()
    }

    /// Offer a command to every live extension in name order.
    ///
    /// Returns `Ok(true)` once one of them handles it.
    pub async fn dispatch(&self, command: &str, args: &[String]) -> Result<bool> {
        let active = self.active.lock().await;
        for ext in active.values() {
            if ext.handle_command(command, args).await? {
                debug!(category = "extension", extension = ext.name(), command, "Command handled");
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn instantiate(
        &self,
        descriptor: &ExtensionDescriptor,
    ) -> std::result::Result<DynExtension, BoxError> {
        let factory = self
            .factories
            .get(&descriptor.name)
            .ok_or_else(|| ExtensionError::NoFactory(descriptor.name.clone()))?;
        let mut ext = factory(descriptor)?;
        ext.on_load().await?;
        Ok(ext)
    }
}

impl Default for FactoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleLoader for FactoryLoader {
    async fn load(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError> {
        let mut active = self.active.lock().await;
        if active.contains_key(&descriptor.name) {
            return Err(ExtensionError::AlreadyLoaded(descriptor.name.clone()).into());
        }

        let ext = self.instantiate(descriptor).await?;
        active.insert(descriptor.name.clone(), ext);
        info!(category = "extension", extension = %descriptor.name, "Instantiated extension");
        Ok(())
    }

    async fn unload(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError> {
        let mut active = self.active.lock().await;
        let ext = active
            .get_mut(&descriptor.name)
            .ok_or_else(|| ExtensionError::NotLoaded(descriptor.name.clone()))?;
        // The instance stays live until its hook succeeds.
        ext.on_unload().await?;
        active.remove(&descriptor.name);
        info!(category = "extension", extension = %descriptor.name, "Dropped extension");
        Ok(())
    }

    async fn reload(&self, descriptor: &ExtensionDescriptor) -> std::result::Result<(), BoxError> {
        // One lock for both halves so no command lands between them.
        let mut active = self.active.lock().await;
        let old = active
            .get_mut(&descriptor.name)
            .ok_or_else(|| ExtensionError::NotLoaded(descriptor.name.clone()))?;
        if let Err(e) = old.on_unload().await {
            warn!(category = "extension", extension = %descriptor.name, error = %e, "Unload hook failed, keeping the running instance");
            return Err(e);
        }
        active.remove(&descriptor.name);

        let ext = self.instantiate(descriptor).await?;
        active.insert(descriptor.name.clone(), ext);
        info!(category = "extension", extension = %descriptor.name, "Re-instantiated extension");
        Ok(())
    }

    async fn is_active(&self, name: &str) -> bool {
        self.active.lock().await.contains_key(name)
    }
}
