//! Persistence for OddBot.
//!
//! The silly id mapping lives in a single human-readable JSON file that is
//! rewritten in full on every save. [`MemoryStore`] keeps it in memory instead.

pub mod error;
pub mod mapping;
pub mod memory;

pub use error::{Error, Result};
pub use mapping::{Mapping, MappingBackend, MappingStore};
pub use memory::MemoryStore;
