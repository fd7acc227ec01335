//! I/O Dispatcher
//!
//! Presents a unit's volumes as one contiguous logical byte range.
//!
//! A request is split into per-stripe extents by the [`Striping`] and the
//! extents are issued to the [`VolumeSet`] in address order. Nothing is
//! retried; the first failing extent aborts the request.

use crate::address::Striping;
use crate::error::Result;
use crate::volume::VolumeSet;

/// Fill `buf` from the logical range starting at `logical`
pub fn read(
    volumes: &mut VolumeSet,
    striping: &Striping,
    logical: u64,
    buf: &mut [u8],
) -> Result<()> {
    let mut pos = 0usize;
    for extent in striping.map_range(logical, buf.len() as u64)? {
        let end = pos + extent.len as usize;
        volumes.read_at(extent.address.volume, extent.address.offset, &mut buf[pos..end])?;
        pos = end;
    }
    Ok(())
}

/// Write all of `buf` to the logical range starting at `logical`
pub fn write(volumes: &mut VolumeSet, striping: &Striping, logical: u64, buf: &[u8]) -> Result<()> {
    let mut pos = 0usize;
    for extent in striping.map_range(logical, buf.len() as u64)? {
        let end = pos + extent.len as usize;
        volumes.write_at(extent.address.volume, extent.address.offset, &buf[pos..end])?;
        pos = end;
    }
    Ok(())
}
