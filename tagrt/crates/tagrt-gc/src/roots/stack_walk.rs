//! Stack Walk - Roots from frames built by generated code
//!
//! The code generator and the walker share the [`frame`] contract. Every
//! generated frame looks like this, addresses decreasing downward:
//!
//! ```text
//!   higher addresses
//!   ┌─────────────────────────────┐
//!   │ caller's frame base         │  <- frame base (fp)
//!   ├─────────────────────────────┤
//!   │ canary 0xc0decafe           │  fp - 1w
//!   ├─────────────────────────────┤
//!   │ tagged FunctionContext      │  fp - 2w
//!   ├─────────────────────────────┤
//!   │ spill slot 0                │  fp - 3w
//!   │ ... spill_count slots       │
//!   ├─────────────────────────────┤
//!   │ saved register 0..3         │
//!   └─────────────────────────────┘
//!   lower addresses
//! ```
//!
//! Walking starts at `stack_low` (the newest generated frame) and follows the
//! saved frame bases until it reaches `stack_high` (the outermost frame).

use super::{Root, RootProvider};
use crate::activation::FunctionContext;
use crate::invariant;
use crate::tagging::{has_pointer_tag, untag_pointer};
use crate::util::{read_word, Address, WORD_SIZE};

/// Frame layout contract shared with the code generator
pub mod frame {
    use crate::util::{Word, WORD_SIZE};

    /// Value stored one word below every frame base
    pub const CANARY: Word = 0xc0de_cafe;

    /// Words below the frame base holding the canary
    pub const CANARY_SLOT: usize = 1;

    /// Words below the frame base holding the tagged FunctionContext
    pub const CONTEXT_SLOT: usize = 2;

    /// Words below the frame base of the first spill slot
    pub const FIRST_SPILL_SLOT: usize = 3;

    /// Callee-saved registers pushed below the spill area
    pub const SAVED_REGISTER_COUNT: usize = 3;

    /// Address of the slot `index` words below `fp`
    #[inline]
    pub fn slot(fp: usize, index: usize) -> usize {
        fp - index * WORD_SIZE
    }

    /// Words one frame occupies below its base
    pub fn words_below_base(spill_count: usize) -> usize {
        FIRST_SPILL_SLOT - 1 + spill_count + SAVED_REGISTER_COUNT
    }
}

/// FrameWalker - root provider over a range of generated frames
#[derive(Debug, Clone, Copy)]
pub struct FrameWalker {
    low: Address,
    high: Address,
}

impl FrameWalker {
    /// Walker over frames from `low` up to and including `high`
    pub fn new(low: Address, high: Address) -> Self {
        Self { low, high }
    }

    pub fn low(&self) -> Address {
        self.low
    }

    pub fn high(&self) -> Address {
        self.high
    }

    /// Record the slot if it holds a pointer-tagged word
    ///
    /// # Safety
    ///
    /// `slot` must be a readable stack word.
    unsafe fn scan_slot(slot: Address, roots: &mut Vec<Root>) {
        let value = read_word(slot);
        if has_pointer_tag(value) {
            log::trace!("stack root {:#x} at slot {:#x}", value, slot);
            roots.push(Root::new(slot, value));
        }
    }

    /// Collect the roots of the single frame based at `fp`
    ///
    /// # Safety
    ///
    /// `fp` must be the base of a frame laid out per [`frame`].
    unsafe fn scan_frame(fp: Address, roots: &mut Vec<Root>) {
        let canary = read_word(frame::slot(fp, frame::CANARY_SLOT));
        invariant!(
            canary == frame::CANARY,
            "bad canary {:#x} in frame {:#x}",
            canary,
            fp
        );

        let context_slot = frame::slot(fp, frame::CONTEXT_SLOT);
        let context = read_word(context_slot);
        roots.push(Root::new(context_slot, context));
        let spill_count = FunctionContext::spill_count_at(untag_pointer(context));

        let mut slot = frame::slot(fp, frame::FIRST_SPILL_SLOT);
        for _ in 0..spill_count + frame::SAVED_REGISTER_COUNT {
            Self::scan_slot(slot, roots);
            slot -= WORD_SIZE;
        }
    }
}

impl RootProvider for FrameWalker {
    fn collect_roots(&self, roots: &mut Vec<Root>) {
        let before = roots.len();
        let mut frames = 0usize;
        let mut fp = self.low;

        while fp <= self.high {
            // SAFETY: generated code guarantees every frame between low and
            // high follows the frame contract; the canary check catches
            // violations.
            unsafe {
                Self::scan_frame(fp, roots);
            }
            frames += 1;

            if fp == self.high {
                break;
            }

            // SAFETY: the frame base slot holds the caller's frame base.
            let caller = unsafe { read_word(fp) };
            invariant!(
                caller > fp,
                "frame chain does not advance: caller {:#x} from frame {:#x}",
                caller,
                fp
            );
            fp = caller;
        }

        log::trace!(
            "walked {} frames in [{:#x}, {:#x}], {} roots",
            frames,
            self.low,
            self.high,
            roots.len() - before
        );
    }
}
