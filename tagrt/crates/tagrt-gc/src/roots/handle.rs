//! Temporary Handles - Protect pointers held in native locals
//!
//! Runtime code that keeps a tagged pointer in a Rust local across an
//! allocating call must wrap it in a [`TemporaryHandle`]. The handle owns a
//! heap-allocated slot registered with the heap's [`HandleRegistry`]; the
//! collector treats the slot as a root and rewrites it when the object moves.
//!
//! ```ignore
//! let outer = heap.protect(outer);
//! let context = heap.allocate(size, stack_low)?;   // may move `outer`
//! write_outer(context, outer.get());               // updated value
//! ```

use super::{Root, RootProvider};
use crate::invariant;
use crate::tagging::has_pointer_tag;
use crate::util::{Address, Word};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;

/// Registry of live handle slots, shared between a heap and its handles
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    slots: Arc<Mutex<Vec<Address>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, slot: Address) {
        self.slots.lock().push(slot);
    }

    /// Remove `slot`; handles drop in reverse order, so search from the end
    fn unregister(&self, slot: Address) {
        let mut slots = self.slots.lock();
        if let Some(index) = slots.iter().rposition(|&s| s == slot) {
            slots.remove(index);
        }
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl RootProvider for HandleRegistry {
    fn collect_roots(&self, roots: &mut Vec<Root>) {
        for &slot in self.slots.lock().iter() {
            // SAFETY: a registered slot is the Cell of a live handle.
            let value = unsafe { (*(slot as *const Cell<Word>)).get() };
            roots.push(Root::new(slot, value));
        }
    }
}

/// TemporaryHandle - scoped root for one tagged pointer
///
/// Not `Clone`: two handles for one slot would unregister it twice.
pub struct TemporaryHandle {
    slot: Box<Cell<Word>>,
    registry: HandleRegistry,
}

impl TemporaryHandle {
    /// Protect `value` until the handle is dropped
    ///
    /// # Panics
    ///
    /// If `value` is not pointer-tagged.
    pub fn new(registry: &HandleRegistry, value: Word) -> Self {
        invariant!(
            has_pointer_tag(value),
            "temporary handle on non-pointer word {:#x}",
            value
        );
        let slot = Box::new(Cell::new(value));
        registry.register(slot.as_ptr() as Address);
        Self {
            slot,
            registry: registry.clone(),
        }
    }

    /// Current, possibly relocated, tagged pointer
    #[inline]
    pub fn get(&self) -> Word {
        self.slot.get()
    }

    /// Address of the registered slot
    pub fn slot(&self) -> Address {
        self.slot.as_ptr() as Address
    }
}

impl Drop for TemporaryHandle {
    fn drop(&mut self) {
        self.registry.unregister(self.slot());
    }
}

impl std::fmt::Debug for TemporaryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryHandle")
            .field("value", &format_args!("{:#x}", self.get()))
            .finish()
    }
}
