//! Console host: wires the registry, the loader and the built-in extensions,
//! and turns input lines into lookups and administrative actions.

use std::sync::Arc;

use anyhow::{Context, Result};
use oddbot_core::extension::{ExtensionError, ExtensionRegistry, FactoryLoader, StartupReport};
use oddbot_core::host::{DynNotifier, HostContext};
use oddbot_core::BotConfig;
use oddbot_silly_id::EXTENSION_NAME as SILLY_ID;
use tracing::{error, info, warn};

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Host {
    config: BotConfig,
    loader: Arc<FactoryLoader>,
    registry: ExtensionRegistry,
}

impl Host {
    pub fn new(config: BotConfig, notifier: DynNotifier) -> Self {
        let ctx = HostContext::new(config.clone(), notifier);
        let loader = Arc::new(
            FactoryLoader::new().with_factory(SILLY_ID, oddbot_silly_id::factory(ctx)),
        );
        let registry = ExtensionRegistry::new(loader.clone());
        Self {
            config,
            loader,
            registry,
        }
    }

    /// Discover extensions and load the startup list.
    pub async fn start(&self) -> Result<StartupReport> {
        self.config
            .ensure_data_dir()
            .context("Failed to create data directory")?;

        self.registry
            .discover(&self.config.extensions_dir)
            .await
            .context("Failed to scan extensions")?;

        let report = self
            .registry
            .load_startup(self.config.startup_extensions.as_slice(), self.config.startup_policy)
            .await
            .context("Startup aborted")?;

        for (name, e) in &report.failed {
            error!(category = "host", extension = %name, error = %e, "Extension unavailable");
        }
        info!(category = "host", loaded = ?report.loaded, "Startup complete");
        Ok(report)
    }

    /// Handle one input line.
    pub async fn execute(&self, line: &str) -> Flow {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Flow::Continue;
        };
        let args: Vec<String> = parts.map(String::from).collect();

        let outcome = match (command, args.as_slice()) {
            ("quit" | "exit", _) => return Flow::Quit,
            ("list", _) => {
                self.print_list().await;
                Ok(())
            }
            ("load", [name]) => self.registry.load(name).await,
            ("unload", [name]) => self.registry.unload(name).await,
            ("reload", [name]) => self.registry.reload(name).await,
            ("load" | "unload" | "reload", _) => {
                println!("usage: {} <extension>", command);
                Ok(())
            }
            _ => match self.loader.dispatch(command, &args).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    println!("Unknown command: {}", command);
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        match outcome {
            Ok(()) => {
                if matches!(command, "load" | "unload" | "reload") && args.len() == 1 {
                    println!("{} {}: ok", command, args[0]);
                }
            }
            Err(ExtensionError::Disabled { name, reason }) => {
                warn!(category = "host", extension = %name, %reason, "Extension refused request");
                println!("Error: {} is disabled: {}", name, reason);
            }
            Err(e) => {
                println!("Error: {}", e);
            }
        }
        Flow::Continue
    }

    /// Unload everything that is still loaded.
    pub async fn shutdown(&self) {
        for name in self.registry.loaded().await {
            if let Err(e) = self.registry.unload(&name).await {
                error!(category = "host", extension = %name, error = %e, "Unload on shutdown failed");
            }
        }
    }

    async fn print_list(&self) {
        let infos = self.registry.list().await;
        if infos.is_empty() {
            println!("No extensions discovered.");
            return;
        }
        for info in infos {
            println!(
                "{:<16} {:<10} {}",
                info.descriptor.name,
                info.state.to_string(),
                info.descriptor.location.display()
            );
        }
    }
}
