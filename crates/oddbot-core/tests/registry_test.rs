//! Integration tests for extension discovery and lifecycle.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oddbot_core::config::defaults;
use oddbot_core::extension::*;
use tempfile::TempDir;

struct Noop(String);

#[async_trait]
impl Extension for Noop {
    fn name(&self) -> &str {
        &self.0
    }
}

/// Extension whose unload hook fails while `stuck` is set.
struct Stubborn {
    stuck: Arc<AtomicBool>,
}

#[async_trait]
impl Extension for Stubborn {
    fn name(&self) -> &str {
        "Alpha"
    }

    async fn on_unload(&mut self) -> std::result::Result<(), BoxError> {
        if self.stuck.load(Ordering::SeqCst) {
            return Err("cannot save state".into());
        }
        Ok(())
    }

    async fn handle_command(&self, command: &str, _args: &[String]) -> Result<bool> {
        Ok(command == "ping")
    }
}

fn stubborn_loader(stuck: Arc<AtomicBool>, created: Arc<AtomicUsize>) -> FactoryLoader {
    FactoryLoader::new().with_factory("Alpha", move |_d: &ExtensionDescriptor| {
        created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Stubborn {
            stuck: stuck.clone(),
        }) as DynExtension)
    })
}

fn counting_loader(created: Arc<AtomicUsize>) -> FactoryLoader {
    let mut loader = FactoryLoader::new();
    for name in ["Alpha", "Beta", "Gamma"] {
        let created = created.clone();
        loader.register(name, move |d: &ExtensionDescriptor| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Noop(d.name.clone())) as DynExtension)
        });
    }
    loader
}

fn layout(root: &Path) {
    for name in ["Alpha", "Beta"] {
        fs::create_dir_all(root.join(name)).unwrap();
        fs::write(root.join(name).join(defaults::ENTRY_POINT), "").unwrap();
    }
    // No entry point.
    fs::create_dir_all(root.join("Gamma")).unwrap();
    fs::write(root.join("Gamma").join("README"), "not an extension").unwrap();
    // Stray file at the root.
    fs::write(root.join(defaults::ENTRY_POINT), "").unwrap();
}

#[tokio::test]
async fn test_discover_only_qualifying_directories() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let registry = ExtensionRegistry::new(Arc::new(FactoryLoader::new()));
    let found = registry.discover(root.path()).await.unwrap();

    let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(
        found[0].location,
        root.path().join("Alpha").join(defaults::ENTRY_POINT)
    );
    assert_eq!(registry.state("Alpha").await, Some(ExtensionState::Discovered));
    assert!(!registry.contains("Gamma").await);
}

#[tokio::test]
async fn test_unknown_name_never_reaches_loader() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let created = Arc::new(AtomicUsize::new(0));
    let registry = ExtensionRegistry::new(Arc::new(counting_loader(created.clone())));
    registry.discover(root.path()).await.unwrap();

    // Gamma has a factory but was not discovered.
    for result in [
        registry.load("Gamma").await,
        registry.unload("Gamma").await,
        registry.reload("Gamma").await,
    ] {
        assert!(matches!(result, Err(ExtensionError::Unknown(ref n)) if n == "Gamma"));
    }
    assert_eq!(created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lifecycle_transitions() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let created = Arc::new(AtomicUsize::new(0));
    let loader = Arc::new(counting_loader(created.clone()));
    let registry = ExtensionRegistry::new(loader.clone());
    registry.discover(root.path()).await.unwrap();

    registry.load("Alpha").await.unwrap();
    assert!(registry.is_loaded("Alpha").await);
    assert!(registry.get("Alpha").await.unwrap().loaded_at.is_some());

    // The loader refuses a second load; the registry reports it as a load error.
    let err = registry.load("Alpha").await.unwrap_err();
    assert!(matches!(err, ExtensionError::Load { .. }));
    assert!(registry.is_loaded("Alpha").await);

    registry.reload("Alpha").await.unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(loader.active().await, vec!["Alpha"]);

    registry.unload("Alpha").await.unwrap();
    assert_eq!(registry.state("Alpha").await, Some(ExtensionState::Unloaded));
    assert!(loader.active().await.is_empty());

    let err = registry.unload("Alpha").await.unwrap_err();
    assert!(matches!(err, ExtensionError::Unload { .. }));

    // Beta stays discovered.
    assert_eq!(registry.state("Beta").await, Some(ExtensionState::Discovered));
    assert_eq!(registry.loaded().await, Vec::<String>::new());
}

#[tokio::test]
async fn test_reload_of_unloaded_extension_fails() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let registry = ExtensionRegistry::new(Arc::new(counting_loader(Arc::new(AtomicUsize::new(0)))));
    registry.discover(root.path()).await.unwrap();

    let err = registry.reload("Beta").await.unwrap_err();
    assert!(matches!(err, ExtensionError::Reload { .. }));
    assert_eq!(registry.state("Beta").await, Some(ExtensionState::Discovered));
}

#[tokio::test]
async fn test_failed_unload_hook_keeps_extension_loaded() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let stuck = Arc::new(AtomicBool::new(true));
    let loader = Arc::new(stubborn_loader(stuck.clone(), Arc::new(AtomicUsize::new(0))));
    let registry = ExtensionRegistry::new(loader.clone());
    registry.discover(root.path()).await.unwrap();
    registry.load("Alpha").await.unwrap();

    let err = registry.unload("Alpha").await.unwrap_err();
    assert!(matches!(err, ExtensionError::Unload { .. }));

    // Registry and loader still agree, and the extension keeps answering.
    assert!(registry.is_loaded("Alpha").await);
    assert_eq!(loader.active().await, vec!["Alpha"]);
    assert!(loader.dispatch("ping", &[]).await.unwrap());

    stuck.store(false, Ordering::SeqCst);
    registry.unload("Alpha").await.unwrap();
    assert_eq!(registry.state("Alpha").await, Some(ExtensionState::Unloaded));
    assert!(loader.active().await.is_empty());
}

#[tokio::test]
async fn test_failed_unload_hook_aborts_reload() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let stuck = Arc::new(AtomicBool::new(true));
    let created = Arc::new(AtomicUsize::new(0));
    let loader = Arc::new(stubborn_loader(stuck.clone(), created.clone()));
    let registry = ExtensionRegistry::new(loader.clone());
    registry.discover(root.path()).await.unwrap();
    registry.load("Alpha").await.unwrap();

    let err = registry.reload("Alpha").await.unwrap_err();
    assert!(matches!(err, ExtensionError::Reload { .. }));

    // The old instance was kept and no new one was built.
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(registry.is_loaded("Alpha").await);
    assert!(loader.dispatch("ping", &[]).await.unwrap());

    stuck.store(false, Ordering::SeqCst);
    registry.reload("Alpha").await.unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert!(registry.is_loaded("Alpha").await);
}

#[tokio::test]
async fn test_failed_instantiation_on_reload_marks_unloaded() {
    let root = TempDir::new().unwrap();
    layout(root.path());

    let fail = Arc::new(AtomicBool::new(false));
    let flag = fail.clone();
    let loader = Arc::new(FactoryLoader::new().with_factory(
        "Alpha",
        move |d: &ExtensionDescriptor| {
            if flag.load(Ordering::SeqCst) {
                return Err("import failed".into());
            }
            Ok(Box::new(Noop(d.name.clone())) as DynExtension)
        },
    ));
    let registry = ExtensionRegistry::new(loader.clone());
    registry.discover(root.path()).await.unwrap();
    registry.load("Alpha").await.unwrap();

    fail.store(true, Ordering::SeqCst);
    assert!(registry.reload("Alpha").await.is_err());
    assert_eq!(registry.state("Alpha").await, Some(ExtensionState::Unloaded));
    assert!(loader.active().await.is_empty());
}
