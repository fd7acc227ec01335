//! Error types for stripestore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for stripestore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Initialization Errors
    // -------------------------------------------------------------------------
    /// The unit slot table could not be allocated. Unrecoverable: the caller
    /// is expected to terminate with `Config::fatal_exit_code`.
    #[error("Fatal initialization failure: {0}")]
    FatalInit(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unit {0} is already open")]
    UnitAlreadyOpen(u32),

    #[error("Unit {0} is not open")]
    UnitNotOpen(u32),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Volume {volume} is not open")]
    VolumeNotOpen { volume: u32 },

    #[error("Address out of range: offset {offset} + {len} bytes exceeds limit {limit}")]
    AddressOutOfRange { offset: u64, len: u64, limit: u64 },

    // -------------------------------------------------------------------------
    // TOC Errors
    // -------------------------------------------------------------------------
    #[error("Key already exists: {0}")]
    KeyExists(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Entry {key} holds {size} bytes and cannot grow to {requested}")]
    EntryOverflow { key: String, size: u64, requested: u64 },

    #[error("TOC needs {needed} bytes but the reserved region holds {capacity}")]
    TocOverflow { needed: u64, capacity: u64 },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("TOC corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Only allocation failure during setup is unrecoverable
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::FatalInit(_))
    }

    /// Errors in the I/O class, including out-of-range accesses
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_)
                | StoreError::VolumeNotOpen { .. }
                | StoreError::AddressOutOfRange { .. }
        )
    }

    /// Configuration-class errors leave the unit unopened
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            StoreError::Config(_) | StoreError::UnitAlreadyOpen(_) | StoreError::UnitNotOpen(_)
        )
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
