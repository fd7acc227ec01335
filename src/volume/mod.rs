//! Volume Module
//!
//! The physical backing files of a unit.
//!
//! ## Responsibilities
//! - Open (creating if absent) each backing file of a unit
//! - Positional reads/writes on a single volume
//! - Flush and release every handle on close
//!
//! Volumes are owned by exactly one unit and never shared.

mod set;

pub use set::{Volume, VolumeSet};

/// How existing volume contents are treated on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Keep existing contents and reload the persisted TOC
    #[default]
    Old,

    /// Truncate every volume and start with an empty TOC
    New,
}
