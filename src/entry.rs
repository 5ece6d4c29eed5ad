//! Directory entry model
//!
//! An entry is one slot in a directory: a 6-bit key plus a payload that is
//! one of the four closed wire variants. The variant decides the 2-bit type
//! tag in the descriptor quadlet and whether the entry contributes a payload
//! block after the directory body.

use crate::directory::DirectoryId;
use crate::format::{EntryType, FwAddress};

/// Payload of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// 24-bit value stored directly in the descriptor quadlet.
    Immediate(u32),
    /// Bus address resolved to a quadlet offset from the CSR base.
    CsrOffset(FwAddress),
    /// Owned copy of opaque data, emitted as a checksummed payload block.
    Leaf(Vec<u8>),
    /// Arena handle of a nested directory, emitted recursively.
    Directory(DirectoryId),
}

impl EntryValue {
    /// The wire type tag for this variant.
    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryValue::Immediate(_) => EntryType::Immediate,
            EntryValue::CsrOffset(_) => EntryType::CsrOffset,
            EntryValue::Leaf(_) => EntryType::Leaf,
            EntryValue::Directory(_) => EntryType::Directory,
        }
    }
}

/// One slot of a directory's ordered entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: u8,
    value: EntryValue,
}

impl Entry {
    pub(crate) fn new(key: u8, value: EntryValue) -> Self {
        Entry { key, value }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn value(&self) -> &EntryValue {
        &self.value
    }

    pub fn entry_type(&self) -> EntryType {
        self.value.entry_type()
    }

    pub(crate) fn value_mut(&mut self) -> &mut EntryValue {
        &mut self.value
    }
}

/// Quadlets needed to hold `byte_len` bytes once zero padded.
pub(crate) fn quadlets_for(byte_len: usize) -> usize {
    byte_len.div_ceil(4)
}
