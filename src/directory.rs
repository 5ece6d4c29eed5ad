//! Directory tree construction and the recursive ROM compiler
//!
//! All directories of one compile session live in a [`DirectoryTree`] arena
//! and are addressed by [`DirectoryId`]. Handle equality is identity: two
//! structurally identical sub-directories are still distinct entities, which
//! is what [`DirectoryTree::remove_directory`] compares by.
//!
//! Compilation is depth-first in entry order. A directory's descriptor words
//! are accumulated in scratch space first, because the header CRC covers
//! values that are only final once every entry's word has been computed, and
//! the shared [`RomImage`] is append-only. Header and descriptors are then
//! appended, followed by each leaf or sub-directory payload in the same entry
//! order.

use crate::crc::{compute_crc16_bytes, update_crc16};
use crate::entry::{quadlets_for, Entry, EntryValue};
use crate::error::{Result, RomError};
use crate::format::{
    keys, FwAddress, BLOCK_LENGTH_SHIFT, ENTRY_KEY_SHIFT, ENTRY_TYPE_SHIFT, ENTRY_VALUE_MASK,
    MAX_KEY,
};
use crate::rom::RomImage;
use std::fmt;

/// Largest value of the 16-bit length field in directory and leaf headers.
const MAX_BLOCK_LENGTH: usize = 0xffff;

/// Byte length of the zeroed header that opens a textual descriptor leaf
/// (descriptor_type/specifier_ID and width/character_set/language quadlets;
/// all zero means minimal ASCII text).
const TEXTUAL_DESCRIPTOR_HEADER_LEN: usize = 8;

/// Arena handle of a directory within one [`DirectoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectoryId(usize);

impl fmt::Display for DirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered sequence of entries plus compiler-assigned state.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: Vec<Entry>,
    base_quadlet_offset: Option<usize>,
}

impl Directory {
    /// Entries in insertion order. Order is semantically significant: it
    /// drives offset arithmetic and CRC input order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Quadlet index within the shared image at which the last compile
    /// placed this directory's header. `None` before the first compile.
    pub fn base_quadlet_offset(&self) -> Option<usize> {
        self.base_quadlet_offset
    }

    /// Increment every generation-key Immediate entry, wrapping in 24 bits.
    /// Returns how many entries were bumped.
    ///
    /// Values already outside the 24-bit field are left untouched so the
    /// compile range check reports them instead of masking them into range.
    fn bump_generation(&mut self) -> usize {
        let mut bumped = 0;
        for entry in &mut self.entries {
            if entry.key() == keys::GENERATION {
                if let EntryValue::Immediate(value) = entry.value_mut() {
                    if *value <= ENTRY_VALUE_MASK {
                        *value = value.wrapping_add(1) & ENTRY_VALUE_MASK;
                        bumped += 1;
                    }
                }
            }
        }
        bumped
    }
}

/// Arena of directories for one compile session.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    dirs: Vec<Directory>,
}

impl DirectoryTree {
    /// Create a tree holding a single empty root directory.
    pub fn new() -> Self {
        DirectoryTree {
            dirs: vec![Directory::default()],
        }
    }

    /// Handle of the root directory.
    pub fn root(&self) -> DirectoryId {
        DirectoryId(0)
    }

    /// Allocate a new empty directory in the arena.
    pub fn new_directory(&mut self) -> DirectoryId {
        self.dirs.push(Directory::default());
        DirectoryId(self.dirs.len() - 1)
    }

    /// Borrow a directory by handle.
    pub fn directory(&self, dir: DirectoryId) -> Result<&Directory> {
        self.dirs
            .get(dir.0)
            .ok_or(RomError::UnknownDirectory(dir))
    }

    fn directory_mut(&mut self, dir: DirectoryId) -> Result<&mut Directory> {
        self.dirs
            .get_mut(dir.0)
            .ok_or(RomError::UnknownDirectory(dir))
    }

    fn push_entry(
        &mut self,
        dir: DirectoryId,
        key: u8,
        value: EntryValue,
        desc: Option<&str>,
    ) -> Result<()> {
        self.directory_mut(dir)?.entries.push(Entry::new(key, value));
        if let Some(text) = desc {
            self.add_textual_descriptor(dir, text)?;
        }
        Ok(())
    }

    /// Append an Immediate entry. The value is stored untransformed; the
    /// 24-bit range check happens at compile time, and generation-key
    /// auto-increment is a compile-time effect only.
    pub fn add_immediate(
        &mut self,
        dir: DirectoryId,
        key: u8,
        value: u32,
        desc: Option<&str>,
    ) -> Result<()> {
        self.push_entry(dir, key, EntryValue::Immediate(value), desc)
    }

    /// Append a CSROffset entry. Address validity is checked at compile
    /// time, not insertion time.
    pub fn add_offset(
        &mut self,
        dir: DirectoryId,
        key: u8,
        address: FwAddress,
        desc: Option<&str>,
    ) -> Result<()> {
        self.push_entry(dir, key, EntryValue::CsrOffset(address), desc)
    }

    /// Append a Leaf entry holding a defensive copy of `data`. Mutating the
    /// source buffer afterwards cannot corrupt the entry.
    pub fn add_leaf(
        &mut self,
        dir: DirectoryId,
        key: u8,
        data: &[u8],
        desc: Option<&str>,
    ) -> Result<()> {
        self.push_entry(dir, key, EntryValue::Leaf(data.to_vec()), desc)
    }

    /// Append a Directory entry referencing `child`. The child directory
    /// must belong to this arena.
    pub fn add_directory(
        &mut self,
        parent: DirectoryId,
        key: u8,
        child: DirectoryId,
        desc: Option<&str>,
    ) -> Result<()> {
        self.directory(child)?;
        self.push_entry(parent, key, EntryValue::Directory(child), desc)
    }

    /// Append a textual descriptor leaf in the IEEE 1212 minimal-ASCII
    /// sub-format: an 8-byte zeroed header, the raw string bytes, then zero
    /// padding to the next quadlet boundary. Always stored under the
    /// reserved textual-descriptor key.
    pub fn add_textual_descriptor(&mut self, dir: DirectoryId, text: &str) -> Result<()> {
        let mut data = vec![0u8; TEXTUAL_DESCRIPTOR_HEADER_LEN];
        data.extend_from_slice(text.as_bytes());
        let padded = data.len().div_ceil(4) * 4;
        data.resize(padded, 0);
        self.push_entry(dir, keys::TEXTUAL_DESCRIPTOR, EntryValue::Leaf(data), None)
    }

    /// Remove the first Directory entry of `parent` whose child handle
    /// equals `child` (identity comparison, never structural).
    pub fn remove_directory(&mut self, parent: DirectoryId, child: DirectoryId) -> Result<()> {
        let dir = self.directory_mut(parent)?;
        let position = dir.entries.iter().position(
            |entry| matches!(entry.value(), EntryValue::Directory(c) if *c == child),
        );
        match position {
            Some(index) => {
                dir.entries.remove(index);
                Ok(())
            }
            None => Err(RomError::NoSuchEntry),
        }
    }

    /// Increment the generation-key Immediate entries of `dir` by one.
    ///
    /// This is the non-idempotent effect [`compile`](Self::compile) applies
    /// to every directory it serializes; exposed so callers and tests can
    /// exercise it deliberately. Returns how many entries were bumped.
    pub fn bump_generation(&mut self, dir: DirectoryId) -> Result<usize> {
        Ok(self.directory_mut(dir)?.bump_generation())
    }

    /// Total compiled size of `dir` in quadlets: header, descriptors, and
    /// all leaf and sub-directory payloads, recursively.
    pub fn compiled_size(&self, dir: DirectoryId) -> Result<usize> {
        self.check_acyclic(dir)?;
        self.size_of(dir)
    }

    fn size_of(&self, dir: DirectoryId) -> Result<usize> {
        let directory = self.directory(dir)?;
        let mut size = 1 + directory.entry_count();
        for entry in directory.entries() {
            match entry.value() {
                EntryValue::Immediate(_) | EntryValue::CsrOffset(_) => {}
                EntryValue::Leaf(data) => size += 1 + quadlets_for(data.len()),
                EntryValue::Directory(child) => size += self.size_of(*child)?,
            }
        }
        Ok(size)
    }

    /// Serialize `dir` and its descendants onto the end of `rom`.
    ///
    /// Each call appends a fresh, independent serialization; it never edits
    /// a previous one. Compiling bumps any generation-key entry, so the
    /// operation is deliberately not idempotent. On failure the image is
    /// left as a well-defined prefix that the caller should discard.
    pub fn compile(&mut self, dir: DirectoryId, rom: &mut RomImage) -> Result<()> {
        self.check_acyclic(dir)?;
        self.compile_into(dir, rom).map_err(|err| {
            tracing::warn!("ROM compile aborted: {}", err);
            err
        })
    }

    fn compile_into(&mut self, dir: DirectoryId, rom: &mut RomImage) -> Result<()> {
        let base = rom.quadlet_count();
        let num_entries = {
            let directory = self.directory_mut(dir)?;
            directory.base_quadlet_offset = Some(base);
            directory.bump_generation();
            directory.entries.len()
        };
        if num_entries > MAX_BLOCK_LENGTH {
            return Err(RomError::DirectoryTooLarge(num_entries));
        }
        tracing::debug!(
            "Compiling directory {}: {} entries at quadlet {}",
            dir,
            num_entries,
            base
        );

        // First pass: descriptor words into scratch space. The header CRC
        // covers these words, so nothing reaches the image yet.
        let mut words: Vec<u32> = Vec::with_capacity(num_entries);
        let mut crc: u16 = 0;
        let mut payload_offset = 0usize;
        for index in 0..num_entries {
            let entry = &self.dirs[dir.0].entries[index];
            let key = entry.key();
            if key > MAX_KEY {
                return Err(RomError::KeyOutOfRange(key));
            }
            let entry_type = entry.entry_type();
            let value_field = match entry.value() {
                EntryValue::Immediate(value) => {
                    if *value > ENTRY_VALUE_MASK {
                        return Err(RomError::ImmediateOutOfRange { key, value: *value });
                    }
                    *value
                }
                EntryValue::CsrOffset(address) => address.csr_quadlet_offset()?,
                EntryValue::Leaf(data) => {
                    // Forward quadlet distance from this descriptor slot to
                    // the payload: the remaining descriptor slots, plus all
                    // payload already accounted to earlier entries.
                    let offset = (num_entries - index) + payload_offset;
                    payload_offset += 1 + quadlets_for(data.len());
                    forward_offset(offset)?
                }
                EntryValue::Directory(child) => {
                    let offset = (num_entries - index) + payload_offset;
                    payload_offset += self.size_of(*child)?;
                    forward_offset(offset)?
                }
            };
            let word = value_field
                | ((key as u32) << ENTRY_KEY_SHIFT)
                | ((entry_type as u32) << ENTRY_TYPE_SHIFT);
            crc = update_crc16(crc, word);
            words.push(word);
        }

        let header = ((num_entries as u32) << BLOCK_LENGTH_SHIFT) | crc as u32;
        rom.append_quadlet(header)?;
        rom.append_quadlets(&words)?;

        // Second pass: leaf and sub-directory payloads, same entry order.
        for index in 0..num_entries {
            let child = match self.dirs[dir.0].entries[index].value() {
                EntryValue::Immediate(_) | EntryValue::CsrOffset(_) => None,
                EntryValue::Leaf(data) => {
                    let quadlets = quadlets_for(data.len());
                    if quadlets > MAX_BLOCK_LENGTH {
                        return Err(RomError::LeafTooLarge(quadlets));
                    }
                    let leaf_crc = compute_crc16_bytes(data);
                    let leaf_header =
                        ((quadlets as u32) << BLOCK_LENGTH_SHIFT) | leaf_crc as u32;
                    rom.append_quadlet(leaf_header)?;
                    rom.append_padded(data)?;
                    None
                }
                EntryValue::Directory(child) => Some(*child),
            };
            if let Some(child) = child {
                self.compile_into(child, rom)?;
            }
        }
        Ok(())
    }

    /// Reject cyclic directory graphs before compiling. Sharing a child
    /// between two parents (a DAG) is allowed; a back edge is not.
    fn check_acyclic(&self, from: DirectoryId) -> Result<()> {
        const ON_STACK: u8 = 1;
        const DONE: u8 = 2;

        self.directory(from)?;
        let mut state = vec![0u8; self.dirs.len()];
        let mut stack: Vec<(usize, usize)> = vec![(from.0, 0)];
        state[from.0] = ON_STACK;
        while let Some(frame) = stack.last_mut() {
            let dir = frame.0;
            let mut next_child = None;
            while frame.1 < self.dirs[dir].entries.len() {
                let index = frame.1;
                frame.1 += 1;
                if let EntryValue::Directory(child) = self.dirs[dir].entries[index].value() {
                    next_child = Some(*child);
                    break;
                }
            }
            match next_child {
                Some(child) => {
                    if child.0 >= self.dirs.len() {
                        return Err(RomError::UnknownDirectory(child));
                    }
                    match state[child.0] {
                        ON_STACK => return Err(RomError::DirectoryCycle(child)),
                        DONE => {}
                        _ => {
                            state[child.0] = ON_STACK;
                            stack.push((child.0, 0));
                        }
                    }
                }
                None => {
                    state[dir] = DONE;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

fn forward_offset(offset: usize) -> Result<u32> {
    if offset > ENTRY_VALUE_MASK as usize {
        return Err(RomError::OffsetOutOfRange(offset));
    }
    Ok(offset as u32)
}
