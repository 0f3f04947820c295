//! Alignment Utilities
//!
//! Object sizes and chunk cursors are always word multiples.

use super::WORD_SIZE;

/// Alignment - rounding helpers for power-of-two boundaries
pub struct Alignment;

impl Alignment {
    /// Round `value` up to `alignment`, which must be a power of two
    ///
    /// `None` if the rounded value does not fit in a `usize`.
    ///
    /// # Examples
    /// ```
    /// use tagrt_gc::util::Alignment;
    /// assert_eq!(Alignment::align_up(100, 8), Some(104));
    /// assert_eq!(Alignment::align_up(64, 8), Some(64));
    /// assert_eq!(Alignment::align_up(usize::MAX - 2, 8), None);
    /// ```
    #[inline]
    pub const fn align_up(value: usize, alignment: usize) -> Option<usize> {
        match value.checked_add(alignment - 1) {
            Some(bumped) => Some(bumped & !(alignment - 1)),
            None => None,
        }
    }

    /// Round a byte count up to whole words
    #[inline]
    pub const fn align_word(value: usize) -> Option<usize> {
        Self::align_up(value, WORD_SIZE)
    }

    #[inline]
    pub const fn is_word_aligned(value: usize) -> bool {
        value & (WORD_SIZE - 1) == 0
    }
}
