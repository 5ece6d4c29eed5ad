use crate::directory::DirectoryId;
use crate::format::FwAddress;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RomError {
    #[error("Unknown directory handle: {0}")]
    UnknownDirectory(DirectoryId),

    #[error("Directory cycle detected through {0}")]
    DirectoryCycle(DirectoryId),

    #[error("Entry key 0x{0:02x} does not fit in 6 bits")]
    KeyOutOfRange(u8),

    #[error("Immediate value 0x{value:08x} under key 0x{key:02x} does not fit in 24 bits")]
    ImmediateOutOfRange { key: u8, value: u32 },

    #[error("Address {0} is outside the CSR register space or not quadlet aligned")]
    AddressOutOfRange(FwAddress),

    #[error("Forward offset of {0} quadlets does not fit in the 24-bit value field")]
    OffsetOutOfRange(usize),

    #[error("Leaf payload of {0} quadlets exceeds the 16-bit block length field")]
    LeafTooLarge(usize),

    #[error("Directory with {0} entries exceeds the 16-bit block length field")]
    DirectoryTooLarge(usize),

    #[error("ROM image limit of {limit} quadlets exceeded (append needs {needed})")]
    CapacityExceeded { needed: usize, limit: usize },

    #[error("No matching directory entry to remove")]
    NoSuchEntry,
}

pub type Result<T> = std::result::Result<T, RomError>;
