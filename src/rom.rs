//! Append-only ROM image buffer
//!
//! One `RomImage` is shared by a whole compile pass: every directory in the
//! tree appends into it in traversal order. Bytes are never rewritten once
//! appended, which is why directory headers are finalized in scratch space
//! before they reach the image. Quadlets are stored big-endian, the order the
//! bus transmits them.

use crate::error::{Result, RomError};

/// Growable, append-only buffer of quadlets.
#[derive(Debug, Clone, Default)]
pub struct RomImage {
    bytes: Vec<u8>,
    limit_quadlets: Option<usize>,
}

impl RomImage {
    /// Create an unbounded image.
    pub fn new() -> Self {
        RomImage::default()
    }

    /// Create an image that refuses to grow past `limit_quadlets`.
    ///
    /// Useful for targeting the 1 KiB Configuration ROM window
    /// ([`crate::format::CONFIG_ROM_SPACE_QUADLETS`]).
    pub fn with_limit(limit_quadlets: usize) -> Self {
        RomImage {
            bytes: Vec::new(),
            limit_quadlets: Some(limit_quadlets),
        }
    }

    /// Current length in quadlets.
    pub fn quadlet_count(&self) -> usize {
        self.bytes.len() / 4
    }

    /// Current length in bytes. Always a multiple of 4.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the serialized image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the image, yielding the serialized bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Decode the quadlet at `index`, or `None` past the end.
    pub fn quadlet(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        let chunk = self.bytes.get(start..start + 4)?;
        Some(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// Iterate over the image as decoded quadlets.
    pub fn quadlets(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }

    fn reserve_quadlets(&mut self, quadlets: usize) -> Result<()> {
        if let Some(limit) = self.limit_quadlets {
            let needed = self.quadlet_count() + quadlets;
            if needed > limit {
                return Err(RomError::CapacityExceeded { needed, limit });
            }
        }
        Ok(())
    }

    /// Append one quadlet, big-endian.
    pub fn append_quadlet(&mut self, quad: u32) -> Result<()> {
        self.reserve_quadlets(1)?;
        self.bytes.extend_from_slice(&quad.to_be_bytes());
        Ok(())
    }

    /// Append quadlets in order.
    pub fn append_quadlets(&mut self, quads: &[u32]) -> Result<()> {
        self.reserve_quadlets(quads.len())?;
        for &quad in quads {
            self.bytes.extend_from_slice(&quad.to_be_bytes());
        }
        Ok(())
    }

    /// Append raw bytes, zero padded up to the next quadlet boundary.
    pub fn append_padded(&mut self, data: &[u8]) -> Result<()> {
        let padded = data.len().div_ceil(4) * 4;
        self.reserve_quadlets(padded / 4)?;
        self.bytes.extend_from_slice(data);
        self.bytes.resize(self.bytes.len() + (padded - data.len()), 0);
        Ok(())
    }
}
