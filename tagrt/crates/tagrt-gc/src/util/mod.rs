//! Util Module - Shared Utilities

pub mod alignment;

pub use alignment::Alignment;

/// Native machine word; the unit of storage and of a tagged value
pub type Word = usize;

/// Untagged heap address
pub type Address = usize;

/// Bytes per word
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Read one word from raw memory
///
/// # Safety
///
/// `addr` must be word-aligned and point at readable memory.
#[inline]
pub unsafe fn read_word(addr: Address) -> Word {
    std::ptr::read_volatile(addr as *const Word)
}

/// Write one word to raw memory
///
/// # Safety
///
/// `addr` must be word-aligned and point at writable memory.
#[inline]
pub unsafe fn write_word(addr: Address, value: Word) {
    std::ptr::write_volatile(addr as *mut Word, value)
}
