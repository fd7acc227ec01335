//! In-memory TOC
//!
//! Append-only directory of entries plus its load/flush logic.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::address::{Address, Striping};
use crate::dispatch;
use crate::error::{Result, StoreError};
use crate::volume::VolumeSet;

use super::codec::TocHeader;
use super::{TocEntry, HEADER_SIZE, MAX_KEY_LEN};

/// bincode encodes a Vec as a u64 length prefix followed by the elements
const EMPTY_PAYLOAD_LEN: u64 = 8;

/// The header records the payload length as a u32
const MAX_REGION_SIZE: u64 = HEADER_SIZE + u32::MAX as u64;

/// State captured before a mutation so a failed data write can undo it
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    entries: usize,
    /// Sizes of the entries ending at the watermark, the only ones `grow` touches
    tail_sizes: Vec<(usize, u64)>,
    watermark: u64,
    payload_len: u64,
    dirty: bool,
}

/// Directory of a unit's entries
///
/// ## Allocation
/// New entries are placed at the watermark, which starts right after the
/// reserved region and only ever grows. Removing an entry hides it from
/// lookups but keeps its range allocated.
#[derive(Debug)]
pub struct Toc {
    /// Striping the persisted addresses were computed with
    striping: Striping,

    /// Size of the reserved region at logical offset 0
    region_size: u64,

    /// Every entry ever allocated, in insertion order
    entries: Vec<TocEntry>,

    /// Logical start of each entry, parallel to `entries`
    starts: Vec<u64>,

    /// Live key → index into `entries`
    live: HashMap<String, usize>,

    /// Next free logical offset
    watermark: u64,

    /// Encoded payload length, kept to reject entries that would not fit
    payload_len: u64,

    /// Whether the in-memory state differs from the persisted one
    dirty: bool,
}

impl Toc {
    /// Create an empty TOC for a unit with the given striping
    ///
    /// Striped units need stripes of at least `HEADER_SIZE` bytes so the
    /// header always sits at the start of volume 0, whatever striping the
    /// unit is later reopened with.
    pub fn new(striping: Striping, region_size: u64) -> Result<Self> {
        if region_size < HEADER_SIZE + EMPTY_PAYLOAD_LEN {
            return Err(StoreError::Config(format!(
                "TOC region of {} bytes is smaller than the minimum {}",
                region_size,
                HEADER_SIZE + EMPTY_PAYLOAD_LEN
            )));
        }
        if region_size > MAX_REGION_SIZE {
            return Err(StoreError::Config(format!(
                "TOC region of {} bytes exceeds the maximum {}",
                region_size, MAX_REGION_SIZE
            )));
        }
        if striping.volumes() > 1 && striping.stripe_size() < HEADER_SIZE {
            return Err(StoreError::Config(format!(
                "stripe size {} is smaller than the {}-byte TOC header",
                striping.stripe_size(),
                HEADER_SIZE
            )));
        }

        Ok(Self {
            striping,
            region_size,
            entries: Vec::new(),
            starts: Vec::new(),
            live: HashMap::new(),
            watermark: region_size,
            payload_len: EMPTY_PAYLOAD_LEN,
            dirty: false,
        })
    }

    /// Load the persisted TOC from the reserved region
    ///
    /// An empty first volume or an unwritten header yields an empty TOC.
    /// A header written with a different striping or region size is a
    /// configuration error.
    pub fn load(volumes: &mut VolumeSet, striping: Striping, region_size: u64) -> Result<Self> {
        let mut toc = Self::new(striping, region_size)?;

        if volumes.volume_len(0)? == 0 {
            debug!("no persisted TOC, starting empty");
            return Ok(toc);
        }

        let mut header_buf = [0u8; HEADER_SIZE as usize];
        dispatch::read(volumes, &striping, 0, &mut header_buf).map_err(truncated)?;

        let header = match TocHeader::decode(&header_buf)? {
            Some(header) => header,
            None => {
                debug!("TOC header never written, starting empty");
                return Ok(toc);
            }
        };

        if header.volume_count != striping.volumes() || header.stripe_size != striping.stripe_size() {
            return Err(StoreError::Config(format!(
                "unit was written with {} volumes / stripe {}, opened with {} / {}",
                header.volume_count,
                header.stripe_size,
                striping.volumes(),
                striping.stripe_size()
            )));
        }
        if header.region_size != region_size {
            return Err(StoreError::Config(format!(
                "unit was written with a {}-byte TOC region, opened with {}",
                header.region_size, region_size
            )));
        }
        if header.watermark < region_size {
            return Err(StoreError::Corruption(format!(
                "watermark {} lies inside the {}-byte TOC region",
                header.watermark, region_size
            )));
        }
        if HEADER_SIZE + header.payload_len as u64 > region_size {
            return Err(StoreError::Corruption(format!(
                "TOC payload of {} bytes overruns the reserved region",
                header.payload_len
            )));
        }

        let mut payload = vec![0u8; header.payload_len as usize];
        dispatch::read(volumes, &striping, HEADER_SIZE, &mut payload).map_err(truncated)?;

        let crc = crc32fast::hash(&payload);
        if crc != header.payload_crc {
            return Err(StoreError::Corruption(format!(
                "TOC checksum mismatch: expected {:08x}, got {:08x}",
                header.payload_crc, crc
            )));
        }

        let entries: Vec<TocEntry> = bincode::deserialize(&payload)?;
        if entries.len() as u64 != header.entry_count {
            return Err(StoreError::Corruption(format!(
                "TOC header lists {} entries, payload holds {}",
                header.entry_count,
                entries.len()
            )));
        }

        for entry in entries {
            let start = striping.logical(entry.address)?;
            let end = start.checked_add(entry.size);
            if start < region_size || end.map_or(true, |end| end > header.watermark) {
                return Err(StoreError::Corruption(format!(
                    "entry {} at {} ({} bytes) lies outside the data area",
                    entry.key, entry.address, entry.size
                )));
            }
            if !entry.deleted && toc.live.contains_key(&entry.key) {
                return Err(StoreError::Corruption(format!(
                    "key {} is live twice",
                    entry.key
                )));
            }
            toc.push(entry, start);
        }

        toc.watermark = header.watermark;
        toc.payload_len = header.payload_len as u64;

        info!(
            entries = toc.entries.len(),
            live = toc.live.len(),
            watermark = toc.watermark,
            "loaded TOC"
        );

        Ok(toc)
    }

    /// Write the TOC back to the reserved region if it changed
    pub fn flush(&mut self, volumes: &mut VolumeSet) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let payload = bincode::serialize(&self.entries)?;
        let needed = HEADER_SIZE + payload.len() as u64;
        let overflow = StoreError::TocOverflow {
            needed,
            capacity: self.region_size,
        };
        if needed > self.region_size {
            return Err(overflow);
        }
        let payload_len = u32::try_from(payload.len()).map_err(|_| overflow)?;

        let header = TocHeader {
            volume_count: self.striping.volumes(),
            stripe_size: self.striping.stripe_size(),
            region_size: self.region_size,
            watermark: self.watermark,
            entry_count: self.entries.len() as u64,
            payload_len,
            payload_crc: crc32fast::hash(&payload),
        };

        let mut region = header.encode();
        region.extend_from_slice(&payload);
        dispatch::write(volumes, &self.striping, 0, &region)?;

        self.dirty = false;
        debug!(entries = self.entries.len(), bytes = region.len(), "flushed TOC");

        Ok(())
    }

    /// Allocate `size` bytes for a new entry at the watermark
    ///
    /// Fails with `KeyExists` if a live entry already has this key; the
    /// existing entry is left untouched.
    pub fn insert(&mut self, key: &str, size: u64) -> Result<Address> {
        validate_key(key)?;
        if self.live.contains_key(key) {
            return Err(StoreError::KeyExists(key.to_string()));
        }

        let start = self.watermark;
        let end = start
            .checked_add(size)
            .ok_or(StoreError::AddressOutOfRange {
                offset: start,
                len: size,
                limit: u64::MAX,
            })?;

        let address = self.striping.translate(start);
        let entry = TocEntry::new(key, address, size);

        let needed = HEADER_SIZE + self.payload_len + bincode::serialized_size(&entry)?;
        if needed > self.region_size {
            return Err(StoreError::TocOverflow {
                needed,
                capacity: self.region_size,
            });
        }

        self.payload_len = needed - HEADER_SIZE;
        self.push(entry, start);
        self.watermark = end;
        self.dirty = true;

        debug!(key, %address, size, watermark = end, "allocated entry");

        Ok(address)
    }

    /// Find a live entry
    pub fn lookup(&self, key: &str) -> Result<&TocEntry> {
        self.get(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Find a live entry, `None` if absent
    pub fn get(&self, key: &str) -> Option<&TocEntry> {
        self.live.get(key).map(|&index| &self.entries[index])
    }

    /// Logical start and size of a live entry
    pub fn extent(&self, key: &str) -> Result<(u64, u64)> {
        let index = self.index_of(key)?;
        Ok((self.starts[index], self.entries[index].size))
    }

    /// Whether a live entry has this key
    pub fn contains(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    /// Hide an entry from lookups; its space stays allocated
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let index = self
            .live
            .remove(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        self.entries[index].deleted = true;
        self.dirty = true;

        debug!(key, "removed entry");
        Ok(())
    }

    /// Grow an entry to `new_size` bytes
    ///
    /// Only the entry ending at the watermark can grow. Shrinking is a no-op.
    pub fn grow(&mut self, key: &str, new_size: u64) -> Result<()> {
        let index = self.index_of(key)?;
        let entry = &self.entries[index];
        if new_size <= entry.size {
            return Ok(());
        }

        let start = self.starts[index];
        if start + entry.size != self.watermark {
            return Err(StoreError::EntryOverflow {
                key: key.to_string(),
                size: entry.size,
                requested: new_size,
            });
        }
        let end = start
            .checked_add(new_size)
            .ok_or(StoreError::AddressOutOfRange {
                offset: start,
                len: new_size,
                limit: u64::MAX,
            })?;

        self.entries[index].size = new_size;
        self.watermark = end;
        self.dirty = true;

        debug!(key, size = new_size, watermark = end, "grew entry");
        Ok(())
    }

    /// Live entries, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TocEntry> {
        self.entries.iter().filter(|e| !e.deleted)
    }

    /// Every entry ever allocated, deleted ones included
    pub fn history(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Next free logical offset
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Size of the reserved region; the data area starts here
    pub fn region_size(&self) -> u64 {
        self.region_size
    }

    /// Whether there are unflushed changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.len(),
            tail_sizes: self.tail_indices().map(|i| (i, self.entries[i].size)).collect(),
            watermark: self.watermark,
            payload_len: self.payload_len,
            dirty: self.dirty,
        }
    }

    /// Undo every insert and grow made since `checkpoint`
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        for entry in self.entries.drain(checkpoint.entries..) {
            if !entry.deleted {
                self.live.remove(&entry.key);
            }
        }
        self.starts.truncate(checkpoint.entries);
        for (index, size) in checkpoint.tail_sizes {
            self.entries[index].size = size;
        }
        self.watermark = checkpoint.watermark;
        self.payload_len = checkpoint.payload_len;
        self.dirty = checkpoint.dirty;
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn push(&mut self, entry: TocEntry, start: u64) {
        if !entry.deleted {
            self.live.insert(entry.key.clone(), self.entries.len());
        }
        self.entries.push(entry);
        self.starts.push(start);
    }

    /// Entries ending at the watermark; always a suffix of `entries`
    fn tail_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.entries.len())
            .rev()
            .take_while(move |&i| self.starts[i] + self.entries[i].size == self.watermark)
    }

    fn index_of(&self, key: &str) -> Result<usize> {
        self.live
            .get(key)
            .copied()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }
}

impl fmt::Display for Toc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TOC: {} live / {} total entries, watermark {}",
            self.live.len(),
            self.entries.len(),
            self.watermark
        )?;
        writeln!(f, "{:<40} {:>20} {:>14}", "key", "address", "size")?;
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidKey(format!(
            "key of {} bytes exceeds {} bytes",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    Ok(())
}

/// A short read inside the reserved region means a damaged header
fn truncated(err: StoreError) -> StoreError {
    match err {
        StoreError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            StoreError::Corruption("TOC region truncated".to_string())
        }
        other => other,
    }
}
