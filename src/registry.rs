//! Unit Registry
//!
//! Fixed-capacity table of unit slots; the sole owner of unit lifecycle.
//!
//! ## Lifecycle
//! ```text
//!             open_unit                  close_unit
//!   Empty ──────────────▶ Open(Unit) ──────────────▶ Empty
//!     ▲                                                │
//!     └──────────── (reopen reloads the TOC) ◀─────────┘
//! ```

use std::mem;

use tracing::{info, warn};

use crate::address::Address;
use crate::config::{Config, UnitConfig};
use crate::error::{Result, StoreError};
use crate::unit::Unit;
use crate::volume::VolumeSet;

/// Aggregate state of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No registry has been constructed yet
    Uninitialized,

    /// Accepting unit operations
    Ready,

    /// All units closed; no further units may be opened
    ShutDown,
}

/// One entry of the slot table
#[derive(Debug)]
enum Slot {
    Empty,
    Open(Unit),
}

/// Table of all units, indexed by unit id
#[derive(Debug)]
pub struct Registry {
    config: Config,
    slots: Vec<Slot>,
    state: RegistryState,
}

impl Registry {
    /// Allocate the slot table with every slot empty
    ///
    /// Allocation failure is reported as `StoreError::FatalInit`; the
    /// caller decides whether to exit with `Config::fatal_exit_code`.
    pub fn new(config: Config) -> Result<Self> {
        if config.max_units == 0 {
            return Err(StoreError::Config("max_units must be non-zero".to_string()));
        }
        if config.max_volumes_per_unit == 0 {
            return Err(StoreError::Config(
                "max_volumes_per_unit must be non-zero".to_string(),
            ));
        }

        let count = config.max_units as usize;
        let mut slots = Vec::new();
        slots.try_reserve_exact(count).map_err(|e| {
            StoreError::FatalInit(format!("cannot allocate {} unit slots: {}", count, e))
        })?;
        slots.resize_with(count, || Slot::Empty);

        info!(max_units = count, "unit registry initialized");

        Ok(Self {
            config,
            slots,
            state: RegistryState::Ready,
        })
    }

    /// Open a unit in an empty slot
    ///
    /// Fails without touching the slot if `id` is out of range, the unit is
    /// already open, or the unit cannot be opened.
    pub fn open_unit(&mut self, id: u32, unit_config: &UnitConfig) -> Result<&mut Unit> {
        if self.state == RegistryState::ShutDown {
            return Err(StoreError::Config("registry has been shut down".to_string()));
        }
        let index = self.slot_index(id)?;
        if let Slot::Open(_) = self.slots[index] {
            return Err(StoreError::UnitAlreadyOpen(id));
        }

        let unit = Unit::open(id, unit_config, &self.config)?;
        self.slots[index] = Slot::Open(unit);

        match &mut self.slots[index] {
            Slot::Open(unit) => Ok(unit),
            Slot::Empty => Err(StoreError::UnitNotOpen(id)),
        }
    }

    /// Flush a unit's TOC, release its volumes and empty its slot
    ///
    /// Closing a unit that is not open is a no-op. If the TOC cannot be
    /// flushed the unit stays open so the caller can retry.
    pub fn close_unit(&mut self, id: u32) -> Result<()> {
        self.close_slot(id).map(|_| ())
    }

    /// Close a unit and delete its volume files
    pub fn discard_unit(&mut self, id: u32) -> Result<()> {
        if let Some(paths) = self.close_slot(id)? {
            VolumeSet::remove_files(&paths)?;
            info!(unit = id, "discarded unit");
        }
        Ok(())
    }

    /// Whether `id` names an open unit; out-of-range ids are never open
    pub fn is_open(&self, id: u32) -> bool {
        matches!(self.slots.get(id as usize), Some(Slot::Open(_)))
    }

    /// Borrow an open unit
    pub fn unit(&self, id: u32) -> Result<&Unit> {
        match &self.slots[self.slot_index(id)?] {
            Slot::Open(unit) => Ok(unit),
            Slot::Empty => Err(StoreError::UnitNotOpen(id)),
        }
    }

    /// Mutably borrow an open unit
    pub fn unit_mut(&mut self, id: u32) -> Result<&mut Unit> {
        let index = self.slot_index(id)?;
        match &mut self.slots[index] {
            Slot::Open(unit) => Ok(unit),
            Slot::Empty => Err(StoreError::UnitNotOpen(id)),
        }
    }

    /// Ids of all open units, ascending
    pub fn open_units(&self) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Open(_)))
            .map(|(index, _)| index as u32)
            .collect()
    }

    /// Close every open unit and refuse further opens
    ///
    /// Every unit is attempted; the first failure is returned.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;
        for id in self.open_units() {
            if let Err(e) = self.close_unit(id) {
                warn!(unit = id, error = %e, "failed to close unit during shutdown");
                first_error.get_or_insert(e);
            }
        }
        self.state = RegistryState::ShutDown;
        info!("unit registry shut down");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // I/O by Unit Id
    // =========================================================================

    /// Read from an open unit at a physical address
    pub fn read(&mut self, id: u32, address: Address, buf: &mut [u8]) -> Result<()> {
        self.unit_mut(id)?.read(address, buf)
    }

    /// Write to an open unit at a physical address
    pub fn write(&mut self, id: u32, address: Address, buf: &[u8]) -> Result<()> {
        self.unit_mut(id)?.write(address, buf)
    }

    /// Read the start of an entry of an open unit
    pub fn read_entry(&mut self, id: u32, key: &str, buf: &mut [u8]) -> Result<()> {
        self.unit_mut(id)?.read_entry(key, buf)
    }

    /// Write an entry of an open unit
    pub fn write_entry(&mut self, id: u32, key: &str, data: &[u8]) -> Result<Address> {
        self.unit_mut(id)?.write_entry(key, data)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of slots
    pub fn capacity(&self) -> u32 {
        self.config.max_units
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn slot_index(&self, id: u32) -> Result<usize> {
        if id >= self.config.max_units {
            return Err(StoreError::Config(format!(
                "unit id {} out of range (max {})",
                id,
                self.config.max_units - 1
            )));
        }
        Ok(id as usize)
    }

    /// Close the unit in slot `id`, returning its volume paths if it was open
    fn close_slot(&mut self, id: u32) -> Result<Option<Vec<std::path::PathBuf>>> {
        let index = self.slot_index(id)?;
        let mut unit = match mem::replace(&mut self.slots[index], Slot::Empty) {
            Slot::Open(unit) => unit,
            Slot::Empty => return Ok(None),
        };

        if let Err(e) = unit.flush_toc() {
            self.slots[index] = Slot::Open(unit);
            return Err(e);
        }

        let paths = unit.volumes().paths();
        unit.release()?;
        info!(unit = id, "closed unit");

        Ok(Some(paths))
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if self.state == RegistryState::Ready && !self.open_units().is_empty() {
            let _ = self.shutdown();
        }
    }
}
