//! Address Translator
//!
//! Pure functions between logical unit offsets and physical addresses.

use crate::error::{Result, StoreError};

use super::Address;

/// Striping configuration of one unit
///
/// Fixed for the unit's open lifetime; every persisted address was computed
/// with it, so it is also recorded in the TOC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Striping {
    volumes: u32,
    stripe_size: u64,
}

/// One contiguous piece of a logical range that lives on a single volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// Where the piece starts physically
    pub address: Address,

    /// Where the piece starts in the unit's logical address space
    pub logical: u64,

    /// Length of the piece in bytes
    pub len: u64,
}

impl Striping {
    /// Validate and build a striping configuration
    ///
    /// Fails with a configuration error if `volumes` is zero or above
    /// `max_volumes`, or if `stripe_size` is zero.
    pub fn new(volumes: u32, stripe_size: u64, max_volumes: u32) -> Result<Self> {
        if volumes == 0 {
            return Err(StoreError::Config(
                "a unit needs at least one volume".to_string(),
            ));
        }
        if volumes > max_volumes {
            return Err(StoreError::Config(format!(
                "{} volumes requested, at most {} allowed",
                volumes, max_volumes
            )));
        }
        if stripe_size == 0 {
            return Err(StoreError::Config("stripe size must be non-zero".to_string()));
        }

        Ok(Self {
            volumes,
            stripe_size,
        })
    }

    /// Number of volumes the unit stripes over
    pub fn volumes(&self) -> u32 {
        self.volumes
    }

    /// Bytes per stripe
    pub fn stripe_size(&self) -> u64 {
        self.stripe_size
    }

    /// Map a logical offset to its physical address
    pub fn translate(&self, logical: u64) -> Address {
        if self.volumes == 1 {
            return Address::new(0, logical);
        }

        let n = self.volumes as u64;
        let stripe = logical / self.stripe_size;
        let volume = (stripe % n) as u32;
        let offset = (stripe / n) * self.stripe_size + logical % self.stripe_size;

        Address::new(volume, offset)
    }

    /// Recover the logical offset of a physical address
    pub fn logical(&self, address: Address) -> Result<u64> {
        if address.volume >= self.volumes {
            return Err(StoreError::Config(format!(
                "volume index {} out of range for a {}-volume unit",
                address.volume, self.volumes
            )));
        }
        if self.volumes == 1 {
            return Ok(address.offset);
        }

        let n = self.volumes as u64;
        let stripe_in_volume = address.offset / self.stripe_size;
        let within = address.offset % self.stripe_size;
        let stripe = stripe_in_volume * n + address.volume as u64;

        stripe
            .checked_mul(self.stripe_size)
            .and_then(|base| base.checked_add(within))
            .ok_or(StoreError::AddressOutOfRange {
                offset: address.offset,
                len: 0,
                limit: u64::MAX,
            })
    }

    /// Split `[logical, logical + len)` into per-stripe extents, in address order
    pub fn map_range(&self, logical: u64, len: u64) -> Result<Vec<Extent>> {
        logical
            .checked_add(len)
            .ok_or(StoreError::AddressOutOfRange {
                offset: logical,
                len,
                limit: u64::MAX,
            })?;

        if self.volumes == 1 {
            if len == 0 {
                return Ok(Vec::new());
            }
            return Ok(vec![Extent {
                address: Address::new(0, logical),
                logical,
                len,
            }]);
        }

        let mut extents = Vec::new();
        let mut offset = logical;
        let mut remaining = len;

        while remaining > 0 {
            let in_stripe = offset % self.stripe_size;
            let take = (self.stripe_size - in_stripe).min(remaining);

            extents.push(Extent {
                address: self.translate(offset),
                logical: offset,
                len: take,
            });

            offset += take;
            remaining -= take;
        }

        Ok(extents)
    }
}
