//! Table of Contents Module
//!
//! Per-unit directory of named entries.
//!
//! ## Responsibilities
//! - Register entries (key → address, size) with append-only allocation
//! - Look up, remove and grow entries
//! - Persist the directory to the reserved region at the start of the unit
//!
//! ## On-Disk Format (reserved region, logical offset 0)
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (52 bytes, little endian)                             │
//! │   Magic "STOC" (4) | Version u16 (2) | Flags u16 (2)         │
//! │   VolumeCount u32 (4) | StripeSize u64 (8)                   │
//! │   RegionSize u64 (8) | Watermark u64 (8)                     │
//! │   EntryCount u64 (8) | PayloadLen u32 (4) | PayloadCRC (4)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (PayloadLen bytes)                                   │
//! │   bincode Vec<TocEntry>, deleted entries included            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Unused (up to RegionSize)                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//! Entry data is allocated from `RegionSize` upward and never reclaimed.

mod codec;
mod entry;
mod table;

pub use entry::TocEntry;
pub use table::Toc;

/// Magic bytes identifying a persisted TOC
pub(crate) const MAGIC: &[u8; 4] = b"STOC";

/// Current TOC format version
pub(crate) const VERSION: u16 = 1;

/// Header size: 4 + 2 + 2 + 4 + 8 + 8 + 8 + 8 + 4 + 4 = 52 bytes
pub const HEADER_SIZE: u64 = 52;

/// Longest accepted entry key, in bytes
pub const MAX_KEY_LEN: usize = 80;
