//! Unit Module
//!
//! An open unit: its volumes, striping and TOC, plus address- and
//! key-based I/O.
//!
//! ## Logical Layout
//! ```text
//! 0                region_size                 watermark
//! ├─── TOC region ───┼──── entry data (append-only) ───┼─── unallocated ───▶
//! ```
//! Raw reads and writes must stay inside the allocated data area.

use tracing::{debug, info};

use crate::address::{Address, Striping};
use crate::config::{Config, UnitConfig};
use crate::dispatch;
use crate::error::{Result, StoreError};
use crate::toc::Toc;
use crate::volume::VolumeSet;

/// A logical dataset striped over one or more volumes
#[derive(Debug)]
pub struct Unit {
    /// Slot index in the registry
    id: u32,

    /// Fixed for the unit's open lifetime
    striping: Striping,

    /// Backing files
    volumes: VolumeSet,

    /// Entry directory
    toc: Toc,
}

impl Unit {
    /// Open the unit's volumes and load its TOC
    ///
    /// On failure every volume opened so far is closed again before the
    /// error is returned.
    pub fn open(id: u32, unit_config: &UnitConfig, config: &Config) -> Result<Self> {
        let paths = &unit_config.volume_paths;
        if let Some(count) = unit_config.volume_count {
            if count as usize != paths.len() {
                return Err(StoreError::Config(format!(
                    "unit {} declares {} volumes but lists {} paths",
                    id,
                    count,
                    paths.len()
                )));
            }
        }

        let striping = Striping::new(
            paths.len() as u32,
            unit_config.effective_stripe_size(config),
            config.max_volumes_per_unit,
        )?;
        let region_size = unit_config.effective_toc_region_size(config);

        let mut volumes = VolumeSet::new(config.max_volumes_per_unit);
        let toc = match volumes
            .open(paths, unit_config.mode)
            .and_then(|()| Toc::load(&mut volumes, striping, region_size))
        {
            Ok(toc) => toc,
            Err(e) => {
                let _ = volumes.close();
                return Err(e);
            }
        };

        info!(
            unit = id,
            volumes = striping.volumes(),
            stripe_size = striping.stripe_size(),
            entries = toc.len(),
            "opened unit"
        );

        Ok(Self {
            id,
            striping,
            volumes,
            toc,
        })
    }

    // =========================================================================
    // Address-Based I/O
    // =========================================================================

    /// Read `buf.len()` bytes starting at a physical address
    pub fn read(&mut self, address: Address, buf: &mut [u8]) -> Result<()> {
        let logical = self.striping.logical(address)?;
        self.read_logical(logical, buf)
    }

    /// Write `buf` starting at a physical address
    pub fn write(&mut self, address: Address, buf: &[u8]) -> Result<()> {
        let logical = self.striping.logical(address)?;
        self.write_logical(logical, buf)
    }

    /// Read `buf.len()` bytes starting at a logical offset
    pub fn read_logical(&mut self, logical: u64, buf: &mut [u8]) -> Result<()> {
        self.check_data_range(logical, buf.len() as u64)?;
        dispatch::read(&mut self.volumes, &self.striping, logical, buf)
    }

    /// Write `buf` starting at a logical offset
    pub fn write_logical(&mut self, logical: u64, buf: &[u8]) -> Result<()> {
        self.check_data_range(logical, buf.len() as u64)?;
        dispatch::write(&mut self.volumes, &self.striping, logical, buf)
    }

    // =========================================================================
    // Key-Based I/O
    // =========================================================================

    /// Read the start of an entry into `buf`
    ///
    /// `buf` may be shorter than the entry, never longer.
    pub fn read_entry(&mut self, key: &str, buf: &mut [u8]) -> Result<()> {
        self.read_entry_at(key, 0, buf)
    }

    /// Read a whole entry
    pub fn read_entry_to_vec(&mut self, key: &str) -> Result<Vec<u8>> {
        let (_, size) = self.toc.extent(key)?;
        let mut buf = vec![0u8; size as usize];
        self.read_entry_at(key, 0, &mut buf)?;
        Ok(buf)
    }

    /// Read `buf.len()` bytes starting `offset` bytes into an entry
    pub fn read_entry_at(&mut self, key: &str, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (start, size) = self.toc.extent(key)?;
        let len = buf.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(StoreError::AddressOutOfRange {
                offset,
                len,
                limit: size,
            });
        }

        dispatch::read(&mut self.volumes, &self.striping, start + offset, buf)
    }

    /// Write `data` as the contents of an entry
    ///
    /// A new key is allocated at the watermark. An existing entry is
    /// overwritten from its start; it grows if `data` is longer, which is
    /// only possible for the last allocated entry.
    pub fn write_entry(&mut self, key: &str, data: &[u8]) -> Result<Address> {
        self.write_entry_at(key, 0, data)?;
        Ok(self.toc.lookup(key)?.address)
    }

    /// Write `data` starting `offset` bytes into an entry
    ///
    /// A missing key is created when `offset` is zero. Writes may extend
    /// the entry but never leave a gap after its current end. If the data
    /// write fails, the allocation or growth it needed is undone.
    pub fn write_entry_at(&mut self, key: &str, offset: u64, data: &[u8]) -> Result<()> {
        let len = data.len() as u64;
        let checkpoint = self.toc.checkpoint();

        if !self.toc.contains(key) {
            if offset != 0 {
                return Err(StoreError::AddressOutOfRange {
                    offset,
                    len,
                    limit: 0,
                });
            }
            self.toc.insert(key, len)?;
        } else {
            let (_, size) = self.toc.extent(key)?;
            if offset > size {
                return Err(StoreError::AddressOutOfRange {
                    offset,
                    len,
                    limit: size,
                });
            }
            let end = offset.checked_add(len).ok_or(StoreError::AddressOutOfRange {
                offset,
                len,
                limit: u64::MAX,
            })?;
            self.toc.grow(key, end)?;
        }

        let (start, _) = self.toc.extent(key)?;
        debug!(unit = self.id, key, offset, len, "writing entry");
        let written = dispatch::write(&mut self.volumes, &self.striping, start + offset, data);
        if written.is_err() {
            self.toc.restore(checkpoint);
        }
        written
    }

    /// Remove an entry; its space is not reclaimed
    pub fn remove_entry(&mut self, key: &str) -> Result<()> {
        self.toc.remove(key)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Persist the TOC without closing
    pub fn flush_toc(&mut self) -> Result<()> {
        self.toc.flush(&mut self.volumes)
    }

    /// Flush and release the volumes
    pub(crate) fn release(&mut self) -> Result<()> {
        self.volumes.close()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn striping(&self) -> Striping {
        self.striping
    }

    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    pub fn volumes(&self) -> &VolumeSet {
        &self.volumes
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_data_range(&self, logical: u64, len: u64) -> Result<()> {
        let limit = self.toc.watermark();
        let in_range = logical >= self.toc.region_size()
            && logical.checked_add(len).map_or(false, |end| end <= limit);
        if !in_range {
            return Err(StoreError::AddressOutOfRange {
                offset: logical,
                len,
                limit,
            });
        }
        Ok(())
    }
}
