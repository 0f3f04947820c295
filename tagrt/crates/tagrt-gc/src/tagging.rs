//! Tagging - Int/Pointer encoding inside one word
//!
//! The low [`TAG_WIDTH`] bits of a word select its kind:
//!
//! ```text
//! Int:     [ payload ............................ | 0 ]
//! Pointer: [ word-aligned heap address .......... | 1 ]
//! ```
//!
//! Every other module goes through these functions; nothing else looks at
//! the bit pattern of a value.

use crate::invariant;
use crate::util::{Address, Word};

/// Number of low bits reserved for the tag
pub const TAG_WIDTH: u32 = 1;

/// Mask selecting the tag bits
pub const TAG_MASK: Word = (1 << TAG_WIDTH) - 1;

/// Tag bits of an Int
pub const INT_TAG: Word = 0;

/// Tag bits of a Pointer
pub const POINTER_TAG: Word = 1;

/// True if `word` is a tagged heap pointer
#[inline]
pub fn has_pointer_tag(word: Word) -> bool {
    word & TAG_MASK == POINTER_TAG
}

/// True if `word` is a tagged small integer
#[inline]
pub fn has_int_tag(word: Word) -> bool {
    word & TAG_MASK == INT_TAG
}

/// Encode a small integer
#[inline]
pub fn tag_int(value: i32) -> Word {
    ((value as isize) << TAG_WIDTH) as Word
}

/// Decode a small integer
///
/// # Panics
///
/// If `word` is not Int-tagged.
#[inline]
pub fn untag_int(word: Word) -> i32 {
    invariant!(has_int_tag(word), "untag_int on non-int word {:#x}", word);
    ((word as isize) >> TAG_WIDTH) as i32
}

/// Encode a heap address
///
/// # Panics
///
/// If the address already carries a pointer tag.
#[inline]
pub fn tag_pointer(address: Address) -> Word {
    invariant!(
        !has_pointer_tag(address),
        "tag_pointer on already tagged word {:#x}",
        address
    );
    address | POINTER_TAG
}

/// Decode a heap address
///
/// # Panics
///
/// If `word` is not Pointer-tagged.
#[inline]
pub fn untag_pointer(word: Word) -> Address {
    invariant!(
        has_pointer_tag(word),
        "untag_pointer on non-pointer word {:#x}",
        word
    );
    word ^ POINTER_TAG
}
