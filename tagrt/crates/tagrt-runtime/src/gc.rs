//! GC Runtime - C ABI over one process-wide heap
//!
//! Generated code links against these symbols. The heap lives in a global
//! slot created by [`memory_init`] and dropped by [`memory_teardown`].
//!
//! Failure policy:
//! - Out of memory prints `Error: out of memory` and exits the process with
//!   [`EXIT_OUT_OF_MEMORY`]; no null pointer is ever returned.
//! - Broken invariants (bad canary, tag mismatch, use before init) panic;
//!   a panic cannot unwind out of an `extern "C"` function and aborts there
//!   (guaranteed since Rust 1.81, the workspace minimum).

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tagrt_gc::{Address, Heap, HeapConfig, MemoryError, Result, Word};

/// Exit status after an unrecoverable allocation failure
pub const EXIT_OUT_OF_MEMORY: i32 = 2;

lazy_static! {
    static ref HEAP: Mutex<Option<Heap>> = Mutex::new(None);
}

/// Stress mode requested before the heap existed
static STRESS_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Stack high bound recorded before the heap existed; 0 if none
static PENDING_STACK_HIGH: AtomicUsize = AtomicUsize::new(0);

/// Run `f` on the global heap
///
/// # Panics
///
/// If [`memory_init`] has not run.
fn with_heap<R>(f: impl FnOnce(&mut Heap) -> R) -> R {
    let mut guard = HEAP.lock();
    match guard.as_mut() {
        Some(heap) => f(heap),
        None => panic!("invariant violated: memory manager used before memory_init"),
    }
}

/// Report an allocation failure and terminate
fn exit_out_of_memory(err: MemoryError) -> ! {
    log::error!("{}", err);
    eprintln!("Error: out of memory");
    std::process::exit(EXIT_OUT_OF_MEMORY)
}

fn or_exit<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) if err.is_out_of_memory() => exit_out_of_memory(err),
        Err(err) => panic!("memory manager failure: {}", err),
    }
}

// ============================================================================
// Rust-level entry points
// ============================================================================

/// Create the global heap from `config`; returns false if it cannot be built
///
/// A heap that already exists is kept.
pub fn init_with(config: HeapConfig) -> bool {
    let _ = env_logger::try_init();

    let mut guard = HEAP.lock();
    if guard.is_some() {
        log::warn!("memory_init called twice; keeping the existing heap");
        return true;
    }

    match Heap::new(config) {
        Ok(mut heap) => {
            if STRESS_REQUESTED.load(Ordering::SeqCst) {
                heap.set_gc_stress(true);
            }
            let high = PENDING_STACK_HIGH.load(Ordering::SeqCst);
            if high != 0 {
                heap.set_stack_high(high);
            }
            *guard = Some(heap);
            true
        },
        Err(e) => {
            eprintln!("Failed to create heap: {}", e);
            false
        },
    }
}

/// Allocate with collection; `Err` only on out of memory
pub fn allocate(size: usize, stack_low: Address) -> Result<Address> {
    with_heap(|heap| heap.allocate(size, stack_low))
}

pub fn allocate_no_gc(size: usize) -> Result<Address> {
    with_heap(|heap| heap.allocate_no_gc(size))
}

pub fn create_function_context(
    outer: Word,
    params_and_locals_count: usize,
    return_value_count: usize,
    stack_low: Address,
) -> Result<Word> {
    with_heap(|heap| {
        heap.create_function_context(outer, params_and_locals_count, return_value_count, stack_low)
    })
}

pub fn create_function(
    context: Word,
    code_address: Address,
    params_and_locals_count: usize,
    stack_low: Address,
) -> Result<Word> {
    with_heap(|heap| heap.create_function(context, code_address, params_and_locals_count, stack_low))
}

pub fn create_main_function_context(locals_count: usize) -> Result<Word> {
    with_heap(|heap| heap.create_main_function_context(locals_count))
}

/// True if the global heap exists
pub fn is_initialized() -> bool {
    HEAP.lock().is_some()
}

/// Run `f` with shared access to the global heap, if it exists
pub fn inspect<R>(f: impl FnOnce(&Heap) -> R) -> Option<R> {
    HEAP.lock().as_ref().map(f)
}

// ============================================================================
// C ABI
// ============================================================================

/// Create the heap from the `TAGRT_*` environment
#[no_mangle]
pub extern "C" fn memory_init() -> bool {
    init_with(HeapConfig::from_env())
}

/// Drop the heap and release both chunks
#[no_mangle]
pub extern "C" fn memory_teardown() {
    let heap = HEAP.lock().take();
    if let Some(heap) = heap {
        log::debug!("memory teardown after {} collections", heap.cycle_count());
    }
    STRESS_REQUESTED.store(false, Ordering::SeqCst);
    PENDING_STACK_HIGH.store(0, Ordering::SeqCst);
}

/// Record the frame base of the outermost generated frame
#[no_mangle]
pub extern "C" fn memory_set_stack_high(stack_high: *const Word) {
    let high = stack_high as Address;
    let mut guard = HEAP.lock();
    match guard.as_mut() {
        Some(heap) => heap.set_stack_high(high),
        None => PENDING_STACK_HIGH.store(high, Ordering::SeqCst),
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn runtime_SetStackHigh(stack_high: *const Word) {
    memory_set_stack_high(stack_high);
}

/// Allocate `size` bytes, collecting if needed; exits on out of memory
#[no_mangle]
pub extern "C" fn memory_allocate(size: usize, stack_low: *const Word) -> *mut c_void {
    or_exit(allocate(size, stack_low as Address)) as *mut c_void
}

/// Allocate `size` bytes without collecting; exits on out of memory
#[no_mangle]
pub extern "C" fn memory_allocate_no_gc(size: usize) -> *mut c_void {
    or_exit(allocate_no_gc(size)) as *mut c_void
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn runtime_CreateFunctionContext(
    outer: *mut c_void,
    params_and_locals_count: usize,
    return_value_count: usize,
    stack_low: *const Word,
) -> *mut c_void {
    or_exit(create_function_context(
        outer as Word,
        params_and_locals_count,
        return_value_count,
        stack_low as Address,
    )) as *mut c_void
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn runtime_CreateFunction(
    context: *mut c_void,
    code_address: *const c_void,
    params_and_locals_count: usize,
    stack_low: *const Word,
) -> *mut c_void {
    or_exit(create_function(
        context as Word,
        code_address as Address,
        params_and_locals_count,
        stack_low as Address,
    )) as *mut c_void
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn runtime_CreateMainFunctionContext(locals_count: usize) -> *mut c_void {
    or_exit(create_main_function_context(locals_count)) as *mut c_void
}

/// Force a collection
#[no_mangle]
pub extern "C" fn memory_test_do_gc(stack_low: *const Word) {
    with_heap(|heap| {
        heap.collect(stack_low as Address);
    });
}

/// True if `object` (untagged) is exactly the base of a live object
#[no_mangle]
pub extern "C" fn memory_test_is_live_object(object: *const c_void) -> bool {
    with_heap(|heap| heap.is_live_object(object as Address))
}

/// Collect before every allocation from now on
///
/// May be called before [`memory_init`].
#[no_mangle]
pub extern "C" fn memory_test_set_gc_stress() {
    STRESS_REQUESTED.store(true, Ordering::SeqCst);
    if let Some(heap) = HEAP.lock().as_mut() {
        heap.set_gc_stress(true);
    }
}
