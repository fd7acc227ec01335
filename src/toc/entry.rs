//! TOC entry definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A named, contiguous byte range within a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Unique (among live entries) name of the entry
    pub key: String,

    /// Physical address of the first byte
    pub address: Address,

    /// Length in bytes
    pub size: u64,

    /// Removed entries keep their address range; it is never reused
    pub deleted: bool,
}

impl TocEntry {
    pub fn new(key: impl Into<String>, address: Address, size: u64) -> Self {
        Self {
            key: key.into(),
            address,
            size,
            deleted: false,
        }
    }
}

impl fmt::Display for TocEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<40} {:>20} {:>14}{}",
            self.key,
            self.address.to_string(),
            self.size,
            if self.deleted { "  (deleted)" } else { "" }
        )
    }
}
