//! # tagrt-gc - Tagged-value memory manager
//!
//! Memory manager for a small compiled language: a one-bit tagged value
//! representation and a stop-the-world semispace copying collector that
//! finds its roots by walking the frames generated code lays out.
//!
//! ## Overview
//!
//! - **Tagging**: a word is either a small integer (low bit 0) or a heap
//!   pointer (low bit 1). See [`tagging`].
//! - **Two fixed chunks**: objects are bump-allocated in the current chunk;
//!   a collection copies survivors into the other one and swaps roles.
//! - **Object table**: ascending object bases per chunk, so interior and
//!   derived pointers resolve to their owning object.
//! - **Frame walking**: roots come from frames that carry a canary, a
//!   tagged function context, a spill area and saved registers.
//! - **Temporary handles**: runtime code protects pointers held in Rust
//!   locals across allocating calls.
//!
//! ## Quick Start
//!
//! ```rust
//! use tagrt_gc::{Heap, HeapConfig, roots::NoRoots, tagging};
//!
//! fn main() -> Result<(), tagrt_gc::MemoryError> {
//!     let mut heap = Heap::new(HeapConfig::default())?;
//!
//!     let base = heap.allocate_no_gc(16)?;
//!     let handle = heap.protect(tagging::tag_pointer(base));
//!
//!     // Nothing on the stack; only the handle keeps the object alive.
//!     heap.collect_with(&NoRoots);
//!     assert!(heap.is_live_object(tagging::untag_pointer(handle.get())));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ generated code / runtime builtins             │
//! └──────────────┬────────────────────────────────┘
//!                │ allocate, create_function_context, ...
//! ┌──────────────▼────────────────────────────────┐
//! │ Heap (heap/)                                  │
//! │  current Chunk ── bump ── ObjectTable         │
//! │  other Chunk                                  │
//! └──────────────┬────────────────────────────────┘
//!                │ does not fit → collect
//! ┌──────────────▼────────────────────────────────┐
//! │ gc: roots (FrameWalker + handles)             │
//! │     → Evacuator (relocate/) → flip            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The heap is single-threaded. A process that needs one global heap wraps
//! it in a lock, as the `tagrt-runtime` crate does.

// Core
pub mod config;
pub mod error;
pub mod gc;
pub mod tagging;

// Memory layout
pub mod activation;
pub mod heap;
pub mod object;

// Collection
pub mod relocate;
pub mod roots;

// Monitoring
pub mod logging;
pub mod stats;

// Utilities
pub mod util;

pub use activation::{Function, FunctionContext};
pub use config::HeapConfig;
pub use error::{MemoryError, Result};
pub use gc::GcReason;
pub use heap::Heap;
pub use roots::{FrameWalker, Root, RootProvider, TemporaryHandle};
pub use stats::{CycleStats, HeapStats};
pub use util::{Address, Word, WORD_SIZE};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
