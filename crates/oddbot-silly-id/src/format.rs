//! Grouped binary rendering of silly ids.

use crate::error::{Error, Result};

/// Character placed between bit groups.
pub const SEPARATOR: char = '.';

/// Number of groups in a rendered id.
pub const GROUPS: u32 = oddbot_core::config::defaults::GROUPS;

/// Renders ids of a `GROUPS * gap_size`-bit space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SillyIdFormat {
    gap_size: u32,
}

impl SillyIdFormat {
    pub fn new(gap_size: u32) -> Result<Self> {
        if gap_size == 0 || gap_size > 10 {
            return Err(Error::InvalidGapSize(gap_size));
        }
        Ok(Self { gap_size })
    }

    pub fn gap_size(&self) -> u32 {
        self.gap_size
    }

    /// Width `W` of the id space in bits.
    pub fn bit_width(&self) -> u32 {
        self.gap_size * GROUPS
    }

    /// Largest id, `2^W - 1`.
    pub fn max_value(&self) -> u32 {
        (1u32 << self.bit_width()) - 1
    }

    /// Number of distinct ids, `2^W`.
    pub fn capacity(&self) -> u64 {
        1u64 << self.bit_width()
    }

    pub fn contains(&self, id: u32) -> bool {
        id <= self.max_value()
    }

    /// Length of every rendered id: `W` digits plus the separators.
    pub fn rendered_len(&self) -> usize {
        let width = self.bit_width() as usize;
        width + (width - 1) / self.gap_size as usize
    }

    /// Render `id` as zero-padded binary split into groups from the most
    /// significant end.
    ///
    /// `id` must be inside the id space; see [`contains`](Self::contains).
    pub fn format(&self, id: u32) -> String {
        debug_assert!(self.contains(id), "silly id {} outside {}-bit space", id, self.bit_width());

        let width = self.bit_width() as usize;
        let gap = self.gap_size as usize;
        let bits = format!("{:0width$b}", id, width = width);

        let mut out = String::with_capacity(self.rendered_len());
        for (i, bit) in bits.chars().enumerate() {
            if i > 0 && i % gap == 0 {
                out.push(SEPARATOR);
            }
            out.push(bit);
        }
        out
    }
}

impl Default for SillyIdFormat {
    fn default() -> Self {
        Self {
            gap_size: oddbot_core::config::defaults::GAP_SIZE,
        }
    }
}
