//! Test Utilities for the tagrt-gc test suite
//!
//! [`FakeStack`] lays out frames exactly the way generated code does, so
//! the real frame walker and collector run against them:
//!
//! ```text
//!   words[len-1]  outermost frame base   (stack_high)
//!                 canary, context, spills, saved registers
//!                 next frame base        -> points at the frame above
//!                 ...
//!                 innermost frame base   (stack_low)
//! ```
//!
//! Slots are `Cell`s because the collector rewrites them through raw
//! addresses while the fixture holds shared references.

#![allow(dead_code)]

use std::cell::Cell;
use tagrt_gc::roots::frame;
use tagrt_gc::tagging::{tag_int, tag_pointer, untag_int, untag_pointer};
use tagrt_gc::util::{read_word, write_word};
use tagrt_gc::{Address, CycleStats, FunctionContext, Heap, HeapConfig, Word, WORD_SIZE};

/// Words reserved for a fake stack
pub const STACK_WORDS: usize = 512;

/// Chunk size used by most tests
pub const SMALL_CHUNK: usize = 4096;

/// Frames laid out per the frame contract in a fixed buffer
pub struct FakeStack {
    words: Box<[Cell<Word>]>,
    /// Index of the next free word; frames grow toward index 0
    cursor: usize,
    /// Base indices, outermost first
    frames: Vec<usize>,
}

impl FakeStack {
    pub fn new() -> Self {
        let words: Vec<Cell<Word>> = (0..STACK_WORDS).map(|_| Cell::new(0)).collect();
        Self {
            words: words.into_boxed_slice(),
            cursor: STACK_WORDS,
            frames: Vec::new(),
        }
    }

    fn address(&self, index: usize) -> Address {
        self.words[index].as_ptr() as Address
    }

    /// Push a frame below the current innermost one
    ///
    /// Writes `spills.len()` into the context's spill count. Saved
    /// registers start out as Int zero.
    pub fn push_frame(&mut self, context: Word, spills: &[Word]) -> usize {
        let base = self.cursor - 1;
        let caller = match self.frames.last() {
            Some(&caller) => self.address(caller),
            None => 0,
        };

        unsafe { FunctionContext::from_base(untag_pointer(context)).spill_count = spills.len() };

        self.words[base].set(caller);
        self.words[base - frame::CANARY_SLOT].set(frame::CANARY);
        self.words[base - frame::CONTEXT_SLOT].set(context);
        for (i, &spill) in spills.iter().enumerate() {
            self.words[base - frame::FIRST_SPILL_SLOT - i].set(spill);
        }
        for r in 0..frame::SAVED_REGISTER_COUNT {
            self.words[base - frame::FIRST_SPILL_SLOT - spills.len() - r].set(0);
        }

        self.cursor = base - frame::words_below_base(spills.len());
        self.frames.push(base);
        self.frames.len() - 1
    }

    /// Frame base of the innermost frame
    pub fn low(&self) -> Address {
        self.address(*self.frames.last().expect("no frames pushed"))
    }

    /// Frame base of the outermost frame
    pub fn high(&self) -> Address {
        self.address(self.frames[0])
    }

    pub fn frame_base(&self, frame: usize) -> Address {
        self.address(self.frames[frame])
    }

    pub fn context(&self, frame: usize) -> Word {
        self.words[self.frames[frame] - frame::CONTEXT_SLOT].get()
    }

    pub fn spill(&self, frame: usize, k: usize) -> Word {
        self.words[self.frames[frame] - frame::FIRST_SPILL_SLOT - k].get()
    }

    pub fn set_spill(&self, frame: usize, k: usize, value: Word) {
        self.words[self.frames[frame] - frame::FIRST_SPILL_SLOT - k].set(value);
    }

    fn register_index(&self, frame: usize, r: usize) -> usize {
        let base = self.frames[frame];
        let context = self.context(frame);
        let spills = unsafe { FunctionContext::spill_count_at(untag_pointer(context)) };
        base - frame::FIRST_SPILL_SLOT - spills - r
    }

    pub fn register(&self, frame: usize, r: usize) -> Word {
        self.words[self.register_index(frame, r)].get()
    }

    pub fn set_register(&self, frame: usize, r: usize, value: Word) {
        self.words[self.register_index(frame, r)].set(value);
    }

    /// Overwrite the canary of a frame
    pub fn corrupt_canary(&self, frame: usize) {
        self.words[self.frames[frame] - frame::CANARY_SLOT].set(0xbad);
    }

    /// Overwrite the saved caller base of a frame
    pub fn set_caller(&self, frame: usize, caller: Address) {
        self.words[self.frames[frame]].set(caller);
    }
}

/// A heap plus a fake stack whose outermost frame owns the main context
pub struct HeapFixture {
    pub heap: Heap,
    pub stack: FakeStack,
}

impl HeapFixture {
    /// Heap with `chunk_size` chunks and a main frame with `main_spills`
    /// spill slots (initially Int zero)
    pub fn new(chunk_size: usize, main_spills: usize) -> Self {
        Self::with_config(HeapConfig::with_chunk_size(chunk_size), main_spills)
    }

    pub fn with_config(config: HeapConfig, main_spills: usize) -> Self {
        let mut heap = Heap::new(config).expect("valid heap config");
        let main = heap
            .create_main_function_context(0)
            .expect("main context fits");
        let mut stack = FakeStack::new();
        stack.push_frame(main, &vec![tag_int(0); main_spills]);
        heap.set_stack_high(stack.high());
        Self { heap, stack }
    }

    pub fn collect(&mut self) -> CycleStats {
        self.heap.collect(self.stack.low())
    }

    /// Allocate `words` payload words, possibly collecting
    pub fn allocate(&mut self, words: usize) -> Word {
        let base = self
            .heap
            .allocate(words * WORD_SIZE, self.stack.low())
            .expect("allocation fits");
        tag_pointer(base)
    }

    /// Allocate an object holding the given Int values
    pub fn allocate_ints(&mut self, values: &[i32]) -> Word {
        let object = self.allocate(values.len());
        for (i, &value) in values.iter().enumerate() {
            set_field(object, i, tag_int(value));
        }
        object
    }

    /// Push a frame for a fresh context nested in the innermost frame's one
    pub fn push_function_frame(&mut self, spills: usize) -> usize {
        let outer = self.stack.context(self.stack.frames.len() - 1);
        let context = self
            .heap
            .create_function_context(outer, 0, 0, self.stack.low())
            .expect("context fits");
        self.stack.push_frame(context, &vec![tag_int(0); spills])
    }
}

/// Read payload word `index` of a tagged object
pub fn field(object: Word, index: usize) -> Word {
    unsafe { read_word(untag_pointer(object) + index * WORD_SIZE) }
}

pub fn set_field(object: Word, index: usize, value: Word) {
    unsafe { write_word(untag_pointer(object) + index * WORD_SIZE, value) }
}

/// Int payload of an object as a vector
pub fn ints(object: Word, len: usize) -> Vec<i32> {
    (0..len).map(|i| untag_int(field(object, i))).collect()
}

/// Assert a tagged pointer refers to a live object in the current chunk
pub fn assert_live(heap: &Heap, object: Word, context: &str) {
    let base = untag_pointer(object);
    assert!(
        heap.is_live_object(base),
        "{}: {:#x} is not a live object",
        context,
        base
    );
}
