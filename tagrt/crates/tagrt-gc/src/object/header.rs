//! Object Header - Two words stored before every object's base
//!
//! ```text
//!            ┌──────────────────────────────┐
//! base - 2w  │ byte size  |  forward address│  <- size_or_forward
//!            ├──────────────────────────────┤
//! base - 1w  │ color (WHITE / MOVED)        │
//!            ├──────────────────────────────┤
//! base       │ payload word 0               │  <- value stored in tagged pointers
//!            │ ...                          │
//!            └──────────────────────────────┘
//! ```
//!
//! The first slot is overloaded: it holds the payload size until the object
//! is evacuated, then the address of its copy. The copy keeps the original
//! header, so the size of a moved object is read through its forward.

use crate::invariant;
use crate::util::{Address, Alignment, Word, WORD_SIZE};

/// Size of object header in bytes
pub const HEADER_SIZE: usize = 2 * WORD_SIZE;

/// Forwarding state recorded in the color slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Color {
    /// Not yet evacuated in this cycle
    White = 0,
    /// Evacuated; the size slot holds the forward address
    Moved = 3,
}

impl Color {
    fn from_word(word: Word) -> Self {
        match word {
            0 => Color::White,
            3 => Color::Moved,
            other => panic!("invariant violated: corrupt object color {:#x}", other),
        }
    }
}

/// Decoded view of the size/forward slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    NotMoved { byte_size: usize },
    Moved { forward: Address },
}

/// Object Header
#[repr(C)]
#[derive(Debug)]
pub struct ObjectHeader {
    size_or_forward: Word,
    color: Word,
}

impl ObjectHeader {
    /// Header of the object at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the base of an object inside a live chunk, so that the
    /// two words before it are that object's header.
    #[inline]
    pub unsafe fn from_base<'a>(base: Address) -> &'a mut ObjectHeader {
        &mut *((base - HEADER_SIZE) as *mut ObjectHeader)
    }

    /// Write a fresh WHITE header
    #[inline]
    pub fn init(&mut self, byte_size: usize) {
        invariant!(
            Alignment::is_word_aligned(byte_size),
            "object size {} is not word aligned",
            byte_size
        );
        self.size_or_forward = byte_size;
        self.color = Color::White as Word;
    }

    /// Current color
    #[inline]
    pub fn color(&self) -> Color {
        Color::from_word(self.color)
    }

    /// Decode the overloaded slot according to the color
    #[inline]
    pub fn state(&self) -> HeaderState {
        match self.color() {
            Color::White => HeaderState::NotMoved {
                byte_size: self.size_or_forward,
            },
            Color::Moved => HeaderState::Moved {
                forward: self.size_or_forward,
            },
        }
    }

    /// Record the forward address and mark MOVED
    #[inline]
    pub fn set_forward(&mut self, forward: Address) {
        invariant!(
            self.color() == Color::White,
            "object already forwarded to {:#x}",
            self.size_or_forward
        );
        self.size_or_forward = forward;
        self.color = Color::Moved as Word;
    }

    /// Payload size of the object at `base`, following the forward if moved
    ///
    /// # Safety
    ///
    /// Same contract as [`ObjectHeader::from_base`]; a forward, if any, must
    /// point at a live copy.
    pub unsafe fn byte_size_of(base: Address) -> usize {
        match Self::from_base(base).state() {
            HeaderState::NotMoved { byte_size } => byte_size,
            HeaderState::Moved { forward } => match Self::from_base(forward).state() {
                HeaderState::NotMoved { byte_size } => byte_size,
                HeaderState::Moved { .. } => {
                    panic!("invariant violated: forward {:#x} is itself forwarded", forward)
                }
            },
        }
    }
}
