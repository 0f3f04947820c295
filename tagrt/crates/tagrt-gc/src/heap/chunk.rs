//! Chunk - One semispace
//!
//! A chunk is an anonymous mapping with a bump cursor and the table of
//! objects allocated in it. Free memory is filled with the zap pattern so
//! stale reads stand out.
//!
//! ```text
//! start                      cursor                         end
//!   │ hdr │ payload │ hdr │ payload │ 0x41 0x41 0x41 ...      │
//! ```

use crate::object::{ObjectHeader, ObjectTable, HEADER_SIZE};
use crate::error::{MemoryError, Result};
use crate::invariant;
use crate::util::{Address, WORD_SIZE};
use memmap2::{MmapMut, MmapOptions};

/// Chunk - a fixed-size bump-allocated region
pub struct Chunk {
    /// Backing storage; owns the memory `start..end` refers to
    mmap: MmapMut,
    start: Address,
    cursor: Address,
    end: Address,
    table: ObjectTable,
    zap_value: u8,
}

impl Chunk {
    /// Map a chunk of `size` bytes and fill it with `zap_value`
    pub fn new(size: usize, zap_value: u8) -> Result<Self> {
        let mut mmap = MmapOptions::new().len(size).map_anon().map_err(|e| {
            MemoryError::HeapInitialization(format!(
                "Failed to map {} byte chunk: {}",
                size, e
            ))
        })?;

        mmap.fill(zap_value);
        let start = mmap.as_mut_ptr() as Address;
        invariant!(
            start % WORD_SIZE == 0,
            "chunk mapping {:#x} is not word aligned",
            start
        );

        Ok(Self {
            mmap,
            start,
            cursor: start,
            end: start + size,
            table: ObjectTable::new(),
            zap_value,
        })
    }

    /// True if `addr` lies in `[start, end)`
    #[inline]
    pub fn contains(&self, addr: Address) -> bool {
        self.start <= addr && addr < self.end
    }

    /// True if an object with `byte_size` payload bytes fits
    ///
    /// The check is strict: the last byte before `end` is never handed out.
    #[inline]
    pub fn fits(&self, byte_size: usize) -> bool {
        byte_size
            .checked_add(HEADER_SIZE)
            .and_then(|total| self.cursor.checked_add(total))
            .map_or(false, |new_cursor| new_cursor < self.end)
    }

    /// Bump-allocate a zeroed object, returning its untagged base
    ///
    /// `byte_size` must already be word aligned.
    pub fn try_bump(&mut self, byte_size: usize) -> Option<Address> {
        if !self.fits(byte_size) {
            return None;
        }

        let base = self.cursor + HEADER_SIZE;
        // SAFETY: header and payload lie inside this chunk (checked by fits).
        unsafe {
            ObjectHeader::from_base(base).init(byte_size);
            std::ptr::write_bytes(base as *mut u8, 0, byte_size);
        }
        self.table.push(base);
        self.cursor = base + byte_size;
        Some(base)
    }

    /// Copy header and payload of the object at `old_base` to the cursor
    ///
    /// Returns the base of the copy, or `None` if it does not fit.
    ///
    /// # Safety
    ///
    /// `old_base` must be a WHITE object of `byte_size` payload bytes in
    /// another chunk.
    pub unsafe fn copy_in(&mut self, old_base: Address, byte_size: usize) -> Option<Address> {
        if !self.fits(byte_size) {
            return None;
        }

        let dst = self.cursor;
        std::ptr::copy_nonoverlapping(
            (old_base - HEADER_SIZE) as *const u8,
            dst as *mut u8,
            HEADER_SIZE + byte_size,
        );
        let base = dst + HEADER_SIZE;
        self.table.push(base);
        self.cursor = base + byte_size;
        Some(base)
    }

    /// Forget every object and zap the whole chunk
    pub fn reset(&mut self) {
        self.cursor = self.start;
        self.table.clear();
        self.mmap.fill(self.zap_value);
    }

    #[inline]
    pub fn start(&self) -> Address {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Address {
        self.end
    }

    #[inline]
    pub fn cursor(&self) -> Address {
        self.cursor
    }

    /// Total size in bytes
    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    /// Bytes consumed by headers and payloads
    pub fn used(&self) -> usize {
        self.cursor - self.start
    }

    /// Largest payload a single allocation could still get
    pub fn available(&self) -> usize {
        (self.end - self.cursor).saturating_sub(HEADER_SIZE + 1) & !(WORD_SIZE - 1)
    }

    pub fn table(&self) -> &ObjectTable {
        &self.table
    }

    pub fn zap_value(&self) -> u8 {
        self.zap_value
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("start", &format_args!("{:#x}", self.start))
            .field("cursor", &format_args!("{:#x}", self.cursor))
            .field("end", &format_args!("{:#x}", self.end))
            .field("objects", &self.table.len())
            .finish()
    }
}
