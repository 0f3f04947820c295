//! Relocate Module - Evacuation of reachable objects
//!
//! Evacuation drains a LIFO worklist of [`Root`]s:
//!
//! 1. Resolve the candidate word to an address. Tagged pointers are
//!    untagged; any other word is taken as a raw (possibly derived) pointer.
//! 2. Discard it unless it lands inside an object of the from-chunk.
//! 3. If the object already moved, write `forward + offset` into the slot.
//! 4. Otherwise copy header and payload to the to-chunk, leave a forward
//!    in the old header, queue every payload word of the copy that points
//!    into the from-chunk, then write the new address into the slot.
//!
//! Slots keep their encoding: a tagged slot gets a tagged address back, a
//! raw slot a raw address.

use crate::heap::Chunk;
use crate::invariant;
use crate::object::{HeaderState, ObjectHeader, HEADER_SIZE};
use crate::roots::{Root, RootProvider};
use crate::tagging::{has_pointer_tag, tag_pointer, untag_pointer};
use crate::util::{read_word, write_word, Address, Alignment, Word, WORD_SIZE};

/// Counters for one evacuation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvacuationStats {
    /// Roots supplied by providers
    pub roots: usize,
    /// Objects copied to the to-chunk
    pub objects_copied: usize,
    /// Header and payload bytes copied
    pub bytes_copied: usize,
    /// Slots rewritten, including repeated visits of moved objects
    pub slots_updated: usize,
}

/// Evacuator - copies everything reachable from its roots
pub struct Evacuator<'a> {
    from: &'a mut Chunk,
    to: &'a mut Chunk,
    worklist: Vec<Root>,
    stats: EvacuationStats,
}

/// Address a word refers to, tagged or raw
#[inline]
fn decode(word: Word) -> Address {
    if has_pointer_tag(word) {
        untag_pointer(word)
    } else {
        word
    }
}

impl<'a> Evacuator<'a> {
    pub fn new(from: &'a mut Chunk, to: &'a mut Chunk) -> Self {
        Self {
            from,
            to,
            worklist: Vec::new(),
            stats: EvacuationStats::default(),
        }
    }

    /// Queue every root the provider knows about
    pub fn add_roots(&mut self, provider: &dyn RootProvider) {
        let before = self.worklist.len();
        provider.collect_roots(&mut self.worklist);
        self.stats.roots += self.worklist.len() - before;
    }

    /// Drain the worklist
    pub fn run(mut self) -> EvacuationStats {
        while let Some(root) = self.worklist.pop() {
            self.process(root);
        }
        self.stats
    }

    fn process(&mut self, root: Root) {
        let tagged = has_pointer_tag(root.value);
        let addr = decode(root.value);
        if !self.from.contains(addr) {
            return;
        }

        let (base, offset) = match self.from.table().find(addr) {
            Some(found) => found,
            None => return,
        };

        // SAFETY: `base` comes from the from-chunk's object table.
        let header = unsafe { ObjectHeader::from_base(base) };
        let new_base = match header.state() {
            HeaderState::Moved { forward } => forward,
            HeaderState::NotMoved { byte_size } => {
                let copy = self.evacuate(base, byte_size);
                header.set_forward(copy);
                copy
            }
        };

        let new_addr = new_base + offset;
        let new_value = if tagged {
            tag_pointer(new_addr)
        } else {
            new_addr
        };
        // SAFETY: root slots are stack words, handle cells or payload words
        // of copies in the to-chunk.
        unsafe { write_word(root.slot, new_value) };
        self.stats.slots_updated += 1;
    }

    /// Copy one WHITE object and queue its outgoing pointers
    fn evacuate(&mut self, base: Address, byte_size: usize) -> Address {
        invariant!(
            Alignment::is_word_aligned(byte_size),
            "object {:#x} has unaligned size {}",
            base,
            byte_size
        );

        // SAFETY: `base` is a WHITE object of `byte_size` bytes in `from`.
        let copy = unsafe { self.to.copy_in(base, byte_size) };
        let copy = match copy {
            Some(copy) => copy,
            None => panic!(
                "invariant violated: to-chunk exhausted copying {:#x} ({} bytes)",
                base, byte_size
            ),
        };

        log::trace!("moved {:#x} -> {:#x} ({} bytes)", base, copy, byte_size);
        self.stats.objects_copied += 1;
        self.stats.bytes_copied += HEADER_SIZE + byte_size;

        for slot in (copy..copy + byte_size).step_by(WORD_SIZE) {
            // SAFETY: `slot` is a payload word of the copy just written.
            let word = unsafe { read_word(slot) };
            if self.from.contains(decode(word)) {
                self.worklist.push(Root::new(slot, word));
            }
        }

        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Color;

    fn chunks() -> (Chunk, Chunk) {
        (
            Chunk::new(1024, 0x41).unwrap(),
            Chunk::new(1024, 0x41).unwrap(),
        )
    }

    #[test]
    fn test_unrooted_objects_stay_behind() {
        let (mut from, mut to) = chunks();
        from.try_bump(WORD_SIZE).unwrap();

        let stats = Evacuator::new(&mut from, &mut to).run();
        assert_eq!(stats.objects_copied, 0);
        assert!(to.table().is_empty());
    }

    #[test]
    fn test_tagged_root_is_copied_and_rewritten() {
        let (mut from, mut to) = chunks();
        let base = from.try_bump(2 * WORD_SIZE).unwrap();
        unsafe { write_word(base, 0x1234 << 1) };

        let mut slot: Word = tag_pointer(base);
        let roots = vec![Root::new(&mut slot as *mut Word as Address, slot)];

        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        let stats = evacuator.run();

        let new_base = untag_pointer(slot);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.objects_copied, 1);
        assert!(to.contains(new_base));
        assert_eq!(unsafe { read_word(new_base) }, 0x1234 << 1);
        let old = unsafe { ObjectHeader::from_base(base) };
        assert_eq!(old.color(), Color::Moved);
    }

    #[test]
    fn test_derived_pointer_keeps_offset_and_stays_raw() {
        let (mut from, mut to) = chunks();
        let base = from.try_bump(4 * WORD_SIZE).unwrap();

        let mut slot: Word = base + 3 * WORD_SIZE;
        let roots = vec![Root::new(&mut slot as *mut Word as Address, slot)];

        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        evacuator.run();

        assert!(!has_pointer_tag(slot));
        let (new_base, offset) = to.table().find(slot).unwrap();
        assert_eq!(offset, 3 * WORD_SIZE);
        assert!(to.contains(new_base));
    }

    #[test]
    fn test_shared_object_copied_once() {
        let (mut from, mut to) = chunks();
        let base = from.try_bump(WORD_SIZE).unwrap();

        let mut a: Word = tag_pointer(base);
        let mut b: Word = tag_pointer(base);
        let roots = vec![
            Root::new(&mut a as *mut Word as Address, a),
            Root::new(&mut b as *mut Word as Address, b),
        ];

        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        let stats = evacuator.run();

        assert_eq!(stats.objects_copied, 1);
        assert_eq!(stats.slots_updated, 2);
        assert_eq!(a, b);
        assert_eq!(to.table().len(), 1);
    }

    #[test]
    fn test_payload_pointers_followed() {
        let (mut from, mut to) = chunks();
        let child = from.try_bump(WORD_SIZE).unwrap();
        let parent = from.try_bump(WORD_SIZE).unwrap();
        unsafe {
            write_word(child, 0x2a << 1);
            write_word(parent, tag_pointer(child));
        }

        let mut slot: Word = tag_pointer(parent);
        let roots = vec![Root::new(&mut slot as *mut Word as Address, slot)];
        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        let stats = evacuator.run();

        assert_eq!(stats.objects_copied, 2);
        let new_parent = untag_pointer(slot);
        let new_child = untag_pointer(unsafe { read_word(new_parent) });
        assert!(to.contains(new_child));
        assert_eq!(unsafe { read_word(new_child) }, 0x2a << 1);
    }

    #[test]
    fn test_self_reference_updated() {
        let (mut from, mut to) = chunks();
        let base = from.try_bump(WORD_SIZE).unwrap();
        unsafe { write_word(base, tag_pointer(base)) };

        let mut slot: Word = tag_pointer(base);
        let roots = vec![Root::new(&mut slot as *mut Word as Address, slot)];
        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        evacuator.run();

        let new_base = untag_pointer(slot);
        assert_eq!(unsafe { read_word(new_base) }, tag_pointer(new_base));
    }

    #[test]
    fn test_foreign_words_ignored() {
        let (mut from, mut to) = chunks();
        from.try_bump(WORD_SIZE).unwrap();

        let mut slot: Word = tag_pointer(0x10);
        let roots = vec![Root::new(&mut slot as *mut Word as Address, slot)];
        let mut evacuator = Evacuator::new(&mut from, &mut to);
        evacuator.add_roots(&roots);
        let stats = evacuator.run();

        assert_eq!(stats.slots_updated, 0);
        assert_eq!(slot, tag_pointer(0x10));
    }
}
