//! Silly id allocation.
//!
//! Candidates come from truncating the account id to the low `W` bits. On a
//! collision the allocator probes upward, wrapping at `2^W`, and gives up after
//! `2^W + 1` candidates. Collisions are checked against the assigned values,
//! never the keys.

use std::collections::HashSet;

use oddbot_storage::{Error as StoreError, Mapping, MappingBackend, MappingStore};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::format::SillyIdFormat;

/// Owns the mapping and the backend it is persisted to.
pub struct SillyIdAllocator<B: MappingBackend = MappingStore> {
    backend: B,
    mapping: Mapping,
    /// Every value present in `mapping`.
    used: HashSet<u32>,
    format: SillyIdFormat,
    /// The mapping holds an entry the backend has not accepted yet.
    dirty: bool,
    exhausted: bool,
}

impl<B: MappingBackend> SillyIdAllocator<B> {
    /// Load the mapping from `backend` and check it.
    ///
    /// A mapping with a non-numeric key, a value outside the id space, or two
    /// keys sharing a value is reported as a corrupt store.
    pub fn open(backend: B, gap_size: u32) -> Result<Self> {
        let format = SillyIdFormat::new(gap_size)?;
        let mapping = backend.load()?;

        let mut used = HashSet::with_capacity(mapping.len());
        for (key, &value) in &mapping {
            let problem = if key.parse::<u64>().is_err() {
                Some(format!("key {:?} is not an account id", key))
            } else if !format.contains(value) {
                Some(format!(
                    "value {} of {} is outside the {}-bit space",
                    value,
                    key,
                    format.bit_width()
                ))
            } else if !used.insert(value) {
                Some(format!("value {} is assigned more than once", value))
            } else {
                None
            };

            if let Some(reason) = problem {
                error!(category = "silly_id", location = %backend.location().display(), %reason, "Rejecting silly id database");
                return Err(Error::Store(StoreError::Corrupt {
                    path: backend.location().to_path_buf(),
                    reason,
                }));
            }
        }

        // A full mapping stays full, so exhaustion carries over to every
        // allocator opened on it.
        let exhausted = used.len() as u64 >= format.capacity();
        if exhausted {
            warn!(category = "silly_id", bit_width = format.bit_width(), "Silly id namespace is already full, new ids are disabled");
        }

        info!(category = "silly_id", entries = mapping.len(), bit_width = format.bit_width(), "Silly id allocator ready");
        Ok(Self {
            backend,
            mapping,
            used,
            format,
            dirty: false,
            exhausted,
        })
    }

    /// Assigned id of `external_id`, if it has one.
    pub fn get(&self, external_id: u64) -> Option<u32> {
        self.mapping.get(&external_id.to_string()).copied()
    }

    /// Return the id assigned to `external_id`, allocating one on first use.
    ///
    /// Known ids are returned without touching the backend. A new id is
    /// saved exactly once. If that save fails the id stays assigned in
    /// memory and the error is returned; it is written with the next
    /// successful save or [`flush`](Self::flush).
    ///
    /// Once the namespace has been found full, every new allocation fails
    /// with [`Error::NamespaceExhausted`] without probing again.
    pub fn ensure_assigned(&mut self, external_id: u64) -> Result<u32> {
        let key = external_id.to_string();
        if let Some(&id) = self.mapping.get(&key) {
            return Ok(id);
        }

        if self.exhausted {
            return Err(self.exhausted_error());
        }

        let Some(id) = self.probe(external_id) else {
            self.exhausted = true;
            error!(category = "silly_id", bit_width = self.format.bit_width(), "No more silly ids available, disabling allocation");
            return Err(self.exhausted_error());
        };

        self.mapping.insert(key, id);
        self.used.insert(id);
        self.dirty = true;
        debug!(category = "silly_id", external_id, silly_id = id, "Assigned silly id");

        self.flush()?;
        Ok(id)
    }

    /// Save the mapping if it holds unsaved entries.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Err(e) = self.backend.save(&self.mapping) {
            warn!(category = "silly_id", location = %self.backend.location().display(), error = %e, "Failed to save silly id database");
            return Err(e.into());
        }
        self.dirty = false;
        Ok(())
    }

    /// Render `id` in grouped binary.
    pub fn format(&self, id: u32) -> String {
        self.format.format(id)
    }

    pub fn formatter(&self) -> SillyIdFormat {
        self.format
    }

    pub fn bit_width(&self) -> u32 {
        self.format.bit_width()
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True once the id space is known to be full.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn probe(&self, external_id: u64) -> Option<u32> {
        let mask = self.format.max_value();
        let mut candidate = (external_id & u64::from(mask)) as u32;
        // 2^W + 1 candidates: every residue once plus one extra step.
        for _ in 0..=self.format.capacity() {
            if !self.used.contains(&candidate) {
                return Some(candidate);
            }
            candidate = candidate.wrapping_add(1) & mask;
        }
        None
    }

    fn exhausted_error(&self) -> Error {
        Error::NamespaceExhausted {
            bit_width: self.format.bit_width(),
        }
    }
}
