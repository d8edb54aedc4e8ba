//! In-memory mapping backend.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::mapping::{Mapping, MappingBackend};

/// Mapping backend that never touches the filesystem.
///
/// Counts saves and can be told to fail them, which makes it handy for
/// exercising the allocator's persistence rules.
#[derive(Debug)]
pub struct MemoryStore {
    data: Mutex<Option<Mapping>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    location: PathBuf,
}

impl MemoryStore {
    /// An empty store; the first load initializes it.
    pub fn new() -> Self {
        Self {
            data: Mutex::new(None),
            saves: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
            location: PathBuf::from(":memory:"),
        }
    }

    /// A store that already holds `mapping`.
    pub fn with_mapping(mapping: Mapping) -> Self {
        let store = Self::new();
        *store.data.lock() = Some(mapping);
        store
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following save fail with an IO error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Last saved (or initial) mapping.
    pub fn snapshot(&self) -> Option<Mapping> {
        self.data.lock().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingBackend for MemoryStore {
    fn load(&self) -> Result<Mapping> {
        let mut data = self.data.lock();
        Ok(data.get_or_insert_with(Mapping::new).clone())
    }

    fn save(&self, mapping: &Mapping) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        *self.data.lock() = Some(mapping.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.location
    }
}
