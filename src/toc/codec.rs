//! TOC header encoding and decoding

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

use super::{HEADER_SIZE, MAGIC, VERSION};

/// Fixed-size header at the start of the reserved region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TocHeader {
    pub volume_count: u32,
    pub stripe_size: u64,
    pub region_size: u64,
    pub watermark: u64,
    pub entry_count: u64,
    pub payload_len: u32,
    pub payload_crc: u32,
}

impl TocHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);
        buf.put_u16_le(0); // flags
        buf.put_u32_le(self.volume_count);
        buf.put_u64_le(self.stripe_size);
        buf.put_u64_le(self.region_size);
        buf.put_u64_le(self.watermark);
        buf.put_u64_le(self.entry_count);
        buf.put_u32_le(self.payload_len);
        buf.put_u32_le(self.payload_crc);
        buf
    }

    /// Decode a header; `Ok(None)` means the region was never written
    pub fn decode(mut buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(StoreError::Corruption(format!(
                "TOC header truncated: {} bytes",
                buf.len()
            )));
        }

        let magic = &buf[0..4];
        if magic.iter().all(|&b| b == 0) {
            return Ok(None);
        }
        if magic != &MAGIC[..] {
            return Err(StoreError::Corruption(format!(
                "invalid TOC magic: expected STOC, got {:?}",
                magic
            )));
        }
        buf.advance(4);

        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(StoreError::Corruption(format!(
                "unsupported TOC version: {}",
                version
            )));
        }
        let _flags = buf.get_u16_le();

        Ok(Some(Self {
            volume_count: buf.get_u32_le(),
            stripe_size: buf.get_u64_le(),
            region_size: buf.get_u64_le(),
            watermark: buf.get_u64_le(),
            entry_count: buf.get_u64_le(),
            payload_len: buf.get_u32_le(),
            payload_crc: buf.get_u32_le(),
        }))
    }
}
