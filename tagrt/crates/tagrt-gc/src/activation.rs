//! Activation Records - Heap-resident function contexts and closures
//!
//! Generated code keeps its parameters and locals in a [`FunctionContext`]
//! on the heap, so closures can outlive the frame that created them. The
//! frame walker reads `spill_count` from the context of every frame.
//!
//! ```text
//! FunctionContext                     Function
//! ┌─────────────────────────┐         ┌─────────────────────────┐
//! │ outer (tagged or 0)     │         │ function_context (tag)  │
//! │ spill_count             │         │ code_address            │
//! │ params_and_locals_count │         │ return_value_offset     │
//! │ return_value_count      │         └─────────────────────────┘
//! │ params and locals ...   │
//! │ return values ...       │
//! └─────────────────────────┘
//! ```

use crate::error::Result;
use crate::heap::{Heap, StackRoots};
use crate::invariant;
use crate::roots::RootProvider;
use crate::tagging::{has_pointer_tag, tag_pointer};
use crate::util::{read_word, Address, Word, WORD_SIZE};

/// Fixed part of an activation record; value words follow it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionContext {
    /// Lexically enclosing context, tagged, or 0 for main
    pub outer: Word,
    /// Spill slots the owning frame reserves
    pub spill_count: Word,
    pub params_and_locals_count: Word,
    pub return_value_count: Word,
}

impl FunctionContext {
    /// Payload bytes of a context with the given value counts
    ///
    /// `None` if the size does not fit in a `usize`.
    pub fn byte_size(params_and_locals_count: usize, return_value_count: usize) -> Option<usize> {
        params_and_locals_count
            .checked_add(return_value_count)?
            .checked_mul(WORD_SIZE)?
            .checked_add(std::mem::size_of::<Self>())
    }

    /// Byte offset of the first return value inside the context
    pub fn return_value_offset(params_and_locals_count: usize) -> Option<usize> {
        Self::byte_size(params_and_locals_count, 0)
    }

    /// Address of value word `index` (params and locals, then returns)
    pub fn value_slot(base: Address, index: usize) -> Address {
        base + std::mem::size_of::<Self>() + index * WORD_SIZE
    }

    /// View the context at an untagged address
    ///
    /// # Safety
    ///
    /// `base` must point at a context allocated by a [`Heap`].
    pub unsafe fn from_base<'a>(base: Address) -> &'a mut FunctionContext {
        &mut *(base as *mut FunctionContext)
    }

    /// Read only the spill count of the context at `base`
    ///
    /// # Safety
    ///
    /// Same as [`FunctionContext::from_base`].
    pub unsafe fn spill_count_at(base: Address) -> usize {
        read_word(base + std::mem::offset_of!(FunctionContext, spill_count))
    }
}

/// Closure object
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    /// Tagged context the closure captured
    pub function_context: Word,
    /// Entry point of the generated code
    pub code_address: Word,
    /// Where the callee's context receives return values
    pub return_value_offset: Word,
}

impl Function {
    /// View the closure at an untagged address
    ///
    /// # Safety
    ///
    /// `base` must point at a closure allocated by a [`Heap`].
    pub unsafe fn from_base<'a>(base: Address) -> &'a mut Function {
        &mut *(base as *mut Function)
    }
}

impl Heap {
    /// Allocate a context whose enclosing context is `outer`
    ///
    /// `outer` is kept in a temporary handle across the allocation, so the
    /// stored link is valid even if a collection moves it.
    ///
    /// # Panics
    ///
    /// If `outer` is not pointer-tagged.
    pub fn create_function_context(
        &mut self,
        outer: Word,
        params_and_locals_count: usize,
        return_value_count: usize,
        stack_low: Address,
    ) -> Result<Word> {
        let walker = StackRoots {
            low: stack_low,
            high: self.stack_high,
        };
        self.create_function_context_with(outer, params_and_locals_count, return_value_count, &walker)
    }

    /// [`Heap::create_function_context`] with an explicit root provider
    pub fn create_function_context_with(
        &mut self,
        outer: Word,
        params_and_locals_count: usize,
        return_value_count: usize,
        roots: &dyn RootProvider,
    ) -> Result<Word> {
        invariant!(
            has_pointer_tag(outer),
            "outer context {:#x} is not a tagged pointer",
            outer
        );
        let size = match FunctionContext::byte_size(params_and_locals_count, return_value_count) {
            Some(size) => size,
            None => return Err(self.out_of_memory(usize::MAX)),
        };
        let outer = self.protect(outer);
        let base = self.allocate_with(size, roots)?;

        // SAFETY: `base` was just allocated with room for the context.
        let context = unsafe { FunctionContext::from_base(base) };
        context.outer = outer.get();
        context.spill_count = 0;
        context.params_and_locals_count = params_and_locals_count;
        context.return_value_count = return_value_count;

        log::trace!(
            "function context {:#x}: outer {:#x}, {} values, {} returns",
            base,
            context.outer,
            params_and_locals_count,
            return_value_count
        );
        Ok(tag_pointer(base))
    }

    /// Allocate a closure over `context`
    pub fn create_function(
        &mut self,
        context: Word,
        code_address: Address,
        params_and_locals_count: usize,
        stack_low: Address,
    ) -> Result<Word> {
        let walker = StackRoots {
            low: stack_low,
            high: self.stack_high,
        };
        self.create_function_with(context, code_address, params_and_locals_count, &walker)
    }

    /// [`Heap::create_function`] with an explicit root provider
    pub fn create_function_with(
        &mut self,
        context: Word,
        code_address: Address,
        params_and_locals_count: usize,
        roots: &dyn RootProvider,
    ) -> Result<Word> {
        let offset = FunctionContext::return_value_offset(params_and_locals_count);
        let return_value_offset = match offset {
            Some(offset) => offset,
            None => panic!(
                "invariant violated: return value offset of {} values overflows",
                params_and_locals_count
            ),
        };
        let context = self.protect(context);

        let base = self.allocate_with(std::mem::size_of::<Function>(), roots)?;

        // SAFETY: `base` was just allocated with room for the closure.
        let function = unsafe { Function::from_base(base) };
        function.function_context = context.get();
        function.code_address = code_address;
        function.return_value_offset = return_value_offset;

        Ok(tag_pointer(base))
    }

    /// Allocate the outermost context, before any generated frame exists
    pub fn create_main_function_context(&mut self, locals_count: usize) -> Result<Word> {
        let size = match FunctionContext::byte_size(locals_count, 0) {
            Some(size) => size,
            None => return Err(self.out_of_memory(usize::MAX)),
        };
        let base = self.allocate_no_gc(size)?;

        // SAFETY: `base` was just allocated with room for the context.
        let context = unsafe { FunctionContext::from_base(base) };
        context.outer = 0;
        context.spill_count = 0;
        context.params_and_locals_count = locals_count;
        context.return_value_count = 0;

        log::debug!("main function context {:#x}, {} locals", base, locals_count);
        Ok(tag_pointer(base))
    }
}
