//! # stripestore
//!
//! A record-oriented storage library for scientific computations:
//! - Named entries of arbitrary size, located through a per-unit TOC
//! - Each unit striped round-robin over up to N backing volumes
//! - Append-only allocation; removed entries are never reclaimed
//! - Single-process, synchronous I/O
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Unit Registry                          │
//! │              (slot table, open/close lifecycle)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Unit                               │
//! │              (key → entry, bounds checking)                 │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │       TOC       │──flush/load──▶│  I/O Dispatcher  │
//!   │ (entries, wmk)  │               │ (stripe splits)  │
//!   └─────────────────┘               └────────┬─────────┘
//!                                              │
//!                        ┌─────────────────────┴─────┐
//!                        ▼                           ▼
//!               ┌─────────────────┐        ┌──────────────────┐
//!               │   Translator    │        │    Volume Set    │
//!               │ (logical ↔ phys)│        │ (backing files)  │
//!               └─────────────────┘        └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod address;
pub mod volume;
pub mod dispatch;
pub mod toc;
pub mod unit;
pub mod registry;
pub mod global;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, UnitConfig};
pub use address::{Address, Striping};
pub use registry::{Registry, RegistryState};
pub use unit::Unit;
pub use volume::OpenMode;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of stripestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
