//! IEEE 1212 Configuration ROM directory compiler
//!
//! Builds and serializes the directory tree a FireWire node publishes at its
//! Configuration ROM CSR address, so other nodes can discover its
//! capabilities. The output is bit-exact against the IEEE 1212 layout:
//! quadlet aligned, big-endian, with the serial-bus CRC-16 over every
//! directory and leaf block.
//!
//! ## Features
//!
//! - **Typed entries**: immediate values, CSR register offsets, opaque data
//!   leaves, and nested sub-directories as a closed sum type
//! - **Arena-owned directories** addressed by handle, with an explicit
//!   cycle check before every compile
//! - **Append-only ROM image**: descriptor words are finalized in scratch
//!   space, so emitted bytes are never rewritten
//! - **Generation bumping**: compiling auto-increments generation-key
//!   entries so consumers can detect stale cached ROM copies
//! - **Textual descriptors**: one-call human-readable labels for entries
//!
//! ## Example Usage
//!
//! ```rust
//! use configrom::{keys, DirectoryTree, RomImage};
//!
//! let mut tree = DirectoryTree::new();
//! let root = tree.root();
//! tree.add_immediate(root, keys::NODE_CAPABILITIES, 0x83c0, None).unwrap();
//!
//! let unit = tree.new_directory();
//! tree.add_immediate(unit, keys::UNIT_SPEC_ID, 0x00a02d, None).unwrap();
//! tree.add_immediate(unit, keys::UNIT_SW_VERSION, 0x010001, Some("AV/C Unit")).unwrap();
//! tree.add_directory(root, keys::UNIT_DIRECTORY, unit, None).unwrap();
//!
//! let mut rom = RomImage::new();
//! tree.compile(root, &mut rom).unwrap();
//! assert_eq!(rom.quadlet_count(), tree.compiled_size(root).unwrap());
//! ```
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ directory header   (count:16 << 16) | crc16  │
//! │ descriptor quadlet (value:24 | key:6 | ty:2) │
//! │ ...one per entry, insertion order...         │
//! ├──────────────────────────────────────────────┤
//! │ payload blocks, same entry order:            │
//! │   leaf:  (len:16 << 16) | crc16, padded data │
//! │   dir:   recursively, this whole layout      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The compiler is synchronous and single-writer: mutation and compilation
//! of one tree must be serialized by the caller. On failure the shared
//! image holds a well-defined prefix and should be discarded, not resumed.

pub mod crc;
pub mod directory;
pub mod entry;
pub mod error;
pub mod format;
pub mod rom;

// Re-export commonly used types
pub use crc::{compute_crc16, compute_crc16_bytes, update_crc16};
pub use directory::{Directory, DirectoryId, DirectoryTree};
pub use entry::{Entry, EntryValue};
pub use error::{Result, RomError};
pub use format::{keys, EntryType, FwAddress, CONFIG_ROM_SPACE_QUADLETS};
pub use rom::RomImage;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
