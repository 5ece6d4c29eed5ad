//! Wire-format constants for the IEEE 1212 Configuration ROM
//!
//! A directory is a header quadlet `(count:16 << 16) | crc16` followed by one
//! descriptor quadlet per entry. Each descriptor packs
//! `value:24 | key:6 | type:2`, most significant bits first. Leaf payload
//! blocks reuse the `(length:16 << 16) | crc16` header shape.
//!
//! ```text
//! 31      30 29       24 23                            0
//! ┌─────────┬───────────┬──────────────────────────────┐
//! │ type(2) │  key(6)   │          value(24)           │
//! └─────────┴───────────┴──────────────────────────────┘
//! ```

use crate::error::{Result, RomError};
use std::fmt;

/// Bit position of the 6-bit key within a descriptor quadlet.
pub const ENTRY_KEY_SHIFT: u32 = 24;

/// Bit position of the 2-bit type tag within a descriptor quadlet.
pub const ENTRY_TYPE_SHIFT: u32 = 30;

/// Bit position of the 16-bit length in directory and leaf headers.
pub const BLOCK_LENGTH_SHIFT: u32 = 16;

/// Mask for the 24-bit value field of a descriptor quadlet.
pub const ENTRY_VALUE_MASK: u32 = 0x00ff_ffff;

/// Largest key representable in the 6-bit key field.
pub const MAX_KEY: u8 = 0x3f;

/// Upper 16 bits of every CSR-space bus address.
pub const CSR_ADDRESS_HI: u16 = 0xffff;

/// Lower 32 bits of the CSR register space base (0xFFFF_F000_0000).
pub const CSR_REGISTER_SPACE_BASE_LO: u32 = 0xf000_0000;

/// Lower 32 bits of the Configuration ROM base (CSR base + 0x400).
pub const CSR_CONFIG_ROM_BASE_LO: u32 = 0xf000_0400;

/// Size of the Configuration ROM window in CSR space: 1 KiB, 256 quadlets.
pub const CONFIG_ROM_SPACE_QUADLETS: usize = 256;

/// Well-known directory entry keys from the CSR key namespace.
pub mod keys {
    /// Textual descriptor leaf; also the key used for entry descriptions.
    pub const TEXTUAL_DESCRIPTOR: u8 = 0x01;
    pub const BUS_DEPENDENT_INFO: u8 = 0x02;
    pub const MODULE_VENDOR_ID: u8 = 0x03;
    pub const MODULE_HW_VERSION: u8 = 0x04;
    pub const MODULE_SPEC_ID: u8 = 0x05;
    pub const MODULE_SW_VERSION: u8 = 0x06;
    pub const NODE_VENDOR_ID: u8 = 0x08;
    pub const NODE_HW_VERSION: u8 = 0x09;
    pub const NODE_SPEC_ID: u8 = 0x0a;
    pub const NODE_SW_VERSION: u8 = 0x0b;
    pub const NODE_CAPABILITIES: u8 = 0x0c;
    pub const NODE_UNIQUE_ID: u8 = 0x0d;
    pub const UNIT_DIRECTORY: u8 = 0x11;
    pub const UNIT_SPEC_ID: u8 = 0x12;
    pub const UNIT_SW_VERSION: u8 = 0x13;
    pub const UNIT_DEPENDENT_INFO: u8 = 0x14;
    pub const UNIT_LOCATION: u8 = 0x15;
    pub const MODEL_ID: u8 = 0x17;
    /// Reserved generation key; its Immediate value is bumped on every
    /// compile so consumers can detect stale cached ROM copies.
    pub const GENERATION: u8 = 0x38;
}

/// The 2-bit entry type tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// 24-bit value stored directly in the descriptor.
    Immediate = 0,
    /// Quadlet offset from the CSR register space base.
    CsrOffset = 1,
    /// Forward offset to an opaque data block.
    Leaf = 2,
    /// Forward offset to a nested directory.
    Directory = 3,
}

/// A 48-bit FireWire bus address, split the way the bus transports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FwAddress {
    pub address_hi: u16,
    pub address_lo: u32,
}

impl FwAddress {
    pub fn new(address_hi: u16, address_lo: u32) -> Self {
        FwAddress {
            address_hi,
            address_lo,
        }
    }

    /// Address of a register `byte_offset` bytes past the CSR base.
    pub fn from_csr_offset(byte_offset: u32) -> Self {
        FwAddress {
            address_hi: CSR_ADDRESS_HI,
            address_lo: CSR_REGISTER_SPACE_BASE_LO + byte_offset,
        }
    }

    /// Convert to the quadlet offset from the CSR register space base.
    ///
    /// The address must lie within CSR space, be quadlet aligned, and the
    /// resulting offset must fit the 24-bit descriptor value field.
    pub fn csr_quadlet_offset(&self) -> Result<u32> {
        if self.address_hi != CSR_ADDRESS_HI
            || self.address_lo < CSR_REGISTER_SPACE_BASE_LO
            || self.address_lo & 3 != 0
        {
            return Err(RomError::AddressOutOfRange(*self));
        }
        let offset = (self.address_lo - CSR_REGISTER_SPACE_BASE_LO) / 4;
        if offset > ENTRY_VALUE_MASK {
            return Err(RomError::AddressOutOfRange(*self));
        }
        Ok(offset)
    }
}

impl fmt::Display for FwAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:08x}", self.address_hi, self.address_lo)
    }
}
