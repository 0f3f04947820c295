//! Roots Module - Where collection starts
//!
//! A root is a slot outside the heap (a stack word, a handle) together with
//! the word it held when roots were gathered. The collector rewrites the
//! slot once the referent has moved.
//!
//! Root sources:
//! - [`FrameWalker`]: frames laid out by generated code
//! - [`TemporaryHandle`]: pointers held in native locals

pub mod handle;
pub mod stack_walk;

pub use handle::{HandleRegistry, TemporaryHandle};
pub use stack_walk::{frame, FrameWalker};

use crate::util::{Address, Word};

/// A slot to update and the candidate it held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root {
    /// Address of the word to rewrite
    pub slot: Address,
    /// Word read from the slot; tagged pointer or raw derived pointer
    pub value: Word,
}

impl Root {
    pub fn new(slot: Address, value: Word) -> Self {
        Self { slot, value }
    }
}

/// Source of roots for one collection
///
/// The collector only sees `(slot, value)` pairs, so frame layout
/// conventions stay behind this trait.
pub trait RootProvider {
    /// Append every root to `roots`
    fn collect_roots(&self, roots: &mut Vec<Root>);
}

/// Provider with no roots; collecting with it empties the heap except for
/// handle-protected objects
pub struct NoRoots;

impl RootProvider for NoRoots {
    fn collect_roots(&self, _roots: &mut Vec<Root>) {}
}

impl RootProvider for Vec<Root> {
    fn collect_roots(&self, roots: &mut Vec<Root>) {
        roots.extend_from_slice(self);
    }
}
