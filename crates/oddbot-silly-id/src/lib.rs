//! Silly ids: short, collision-free ids derived from platform account ids.
//!
//! An account id is truncated to its low `3 * gap_size` bits. If another user
//! already holds that value, the next free value (wrapping around) is taken
//! instead. The result is shown as grouped binary, e.g. `101.010.101`.
//!
//! ```rust,ignore
//! use oddbot_silly_id::SillyIdAllocator;
//! use oddbot_storage::MappingStore;
//!
//! let mut ids = SillyIdAllocator::open(MappingStore::new("var/silly_db.json"), 3)?;
//! let id = ids.ensure_assigned(9)?;
//! assert_eq!(ids.format(id), "000.001.001");
//! ```

pub mod allocator;
pub mod error;
pub mod extension;
pub mod format;

pub use allocator::SillyIdAllocator;
pub use error::{Error, Result};
pub use extension::{factory, SillyIdExtension, EXTENSION_NAME, LOOKUP_COMMAND, SILLY_ID_FIELD};
pub use format::{SillyIdFormat, SEPARATOR};
