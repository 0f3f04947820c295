//! tagrt Runtime Library
//!
//! C ABI entry points generated code links against:
//! - heap lifetime (`memory_init`, `memory_teardown`)
//! - allocation with and without collection
//! - activation records (`runtime_CreateFunctionContext`, ...)
//! - test hooks (`memory_test_*`)

mod gc;

pub use gc::*;
