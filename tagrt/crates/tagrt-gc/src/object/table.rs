//! Object Table - Ordered bases of the objects in one chunk
//!
//! Bump allocation hands out strictly increasing addresses, and so does
//! evacuation into the other chunk, so appending keeps the table sorted and
//! interior pointers resolve with a binary search.

use super::header::ObjectHeader;
use crate::invariant;
use crate::util::Address;

/// Base addresses of the objects allocated in a chunk, ascending
#[derive(Debug, Default)]
pub struct ObjectTable {
    bases: Vec<Address>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly allocated or copied object
    pub fn push(&mut self, base: Address) {
        if let Some(&last) = self.bases.last() {
            invariant!(
                base > last,
                "object table out of order: {:#x} after {:#x}",
                base,
                last
            );
        }
        self.bases.push(base);
    }

    /// Resolve `addr` to `(base, offset)` of the object containing it
    ///
    /// An address equal to a base is always found with offset 0, which is
    /// what makes zero-sized objects reachable. Anything else must lie in
    /// `[base, base + byte_size)` of the nearest base at or below it.
    pub fn find(&self, addr: Address) -> Option<(Address, usize)> {
        let index = match self.bases.binary_search(&addr) {
            Ok(_) => return Some((addr, 0)),
            Err(0) => return None,
            Err(insert_at) => insert_at - 1,
        };

        let base = self.bases[index];
        // SAFETY: every entry is the base of an object written by this heap.
        let byte_size = unsafe { ObjectHeader::byte_size_of(base) };
        let offset = addr - base;
        if offset < byte_size {
            Some((base, offset))
        } else {
            None
        }
    }

    /// True if `base` is exactly a recorded base
    pub fn contains_base(&self, base: Address) -> bool {
        self.bases.binary_search(&base).is_ok()
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn clear(&mut self) {
        self.bases.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.bases.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HEADER_SIZE;
    use crate::util::WORD_SIZE;

    /// Lay out objects of the given payload word counts back to back
    fn layout(buffer: &mut [usize], sizes: &[usize]) -> (ObjectTable, Vec<Address>) {
        let mut table = ObjectTable::new();
        let mut bases = Vec::new();
        let mut cursor = buffer.as_mut_ptr() as Address;
        for &words in sizes {
            let base = cursor + HEADER_SIZE;
            unsafe { ObjectHeader::from_base(base).init(words * WORD_SIZE) };
            table.push(base);
            bases.push(base);
            cursor = base + words * WORD_SIZE;
        }
        (table, bases)
    }

    #[test]
    fn test_interior_pointers_resolve() {
        let mut buffer = [0usize; 32];
        let (table, bases) = layout(&mut buffer, &[3, 1, 4]);

        for (i, &base) in bases.iter().enumerate() {
            let size = [3, 1, 4][i] * WORD_SIZE;
            for k in 0..size {
                assert_eq!(table.find(base + k), Some((base, k)));
            }
        }
    }

    #[test]
    fn test_out_of_extent_not_found() {
        let mut buffer = [0usize; 32];
        let (table, bases) = layout(&mut buffer, &[2]);
        let base = bases[0];

        assert_eq!(table.find(base + 2 * WORD_SIZE), None);
        assert_eq!(table.find(base - 1), None);
        assert_eq!(table.find(base - HEADER_SIZE), None);
    }

    #[test]
    fn test_header_bytes_of_next_object_not_found() {
        let mut buffer = [0usize; 32];
        let (table, bases) = layout(&mut buffer, &[1, 1]);
        // The second object's header follows the first payload.
        assert_eq!(table.find(bases[1] - WORD_SIZE), None);
    }

    #[test]
    fn test_zero_sized_object_found_by_base() {
        let mut buffer = [0usize; 32];
        let (table, bases) = layout(&mut buffer, &[0, 2]);

        assert_eq!(table.find(bases[0]), Some((bases[0], 0)));
        assert!(table.contains_base(bases[0]));
        assert_eq!(table.find(bases[0] + 1), None);
    }

    #[test]
    fn test_empty_table() {
        let table = ObjectTable::new();
        assert!(table.is_empty());
        assert_eq!(table.find(0x1000), None);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_descending_push_rejected() {
        let mut table = ObjectTable::new();
        table.push(0x2000);
        table.push(0x1000);
    }
}
