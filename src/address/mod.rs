//! Address Module
//!
//! Maps a unit's logical byte address space onto its volumes.
//!
//! ## Responsibilities
//! - Physical addresses (`volume`, `offset`) as stored in the TOC
//! - Round-robin striping: logical offset → physical address and back
//! - Splitting a logical byte range into per-stripe extents
//!
//! ## Layout (3 volumes, stripe size S)
//! ```text
//! logical:  │ stripe 0 │ stripe 1 │ stripe 2 │ stripe 3 │ stripe 4 │ ...
//!           │  [0,S)   │  [S,2S)  │ [2S,3S)  │ [3S,4S)  │ [4S,5S)  │
//!                │          │          │          │          │
//!                ▼          ▼          ▼          ▼          ▼
//! volume:       v0@0       v1@0       v2@0       v0@S       v1@S
//! ```

mod translator;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use translator::{Extent, Striping};

/// A physical position inside a unit: which volume, and where in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Index into the owning unit's volume set
    pub volume: u32,

    /// Byte offset inside that volume
    pub offset: u64,
}

impl Address {
    /// Start of the unit
    pub const ZERO: Address = Address { volume: 0, offset: 0 };

    pub fn new(volume: u32, offset: u64) -> Self {
        Self { volume, offset }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.volume, self.offset)
    }
}
