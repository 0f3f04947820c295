//! Error Module - Memory Manager Error Types
//!
//! Two kinds of failure exist in the memory manager:
//!
//! - Recoverable conditions (heap exhaustion after a forced collection,
//!   bad configuration, failure to map a chunk) are returned as
//!   [`MemoryError`].
//! - Broken invariants (tag mismatch, bad frame canary, a frame chain
//!   running the wrong way, an unaligned object size) are bugs in the
//!   runtime or the code generator. They panic through [`invariant!`].

use thiserror::Error;

/// Main error type for memory manager operations
///
/// # Examples
///
/// ```rust
/// use tagrt_gc::error::MemoryError;
///
/// fn report(err: MemoryError) {
///     match err {
///         MemoryError::OutOfMemory { requested, available } => {
///             eprintln!("OOM: requested {}, available {}", requested, available);
///         }
///         other => eprintln!("memory error: {}", other),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Out of memory - chunk exhaustion
    ///
    /// **When returned:** An allocation still does not fit after one forced
    /// collection, or a no-GC allocation does not fit.
    ///
    /// **Recovery strategy:** None inside the runtime. The C ABI layer
    /// reports it and terminates the process.
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    /// Heap initialization failed
    ///
    /// **When returned:** Mapping the backing storage of a chunk fails
    ///
    /// **Recovery strategy:** Cannot recover - terminate gracefully
    #[error("Heap initialization failed: {0}")]
    HeapInitialization(String),

    /// Configuration error
    ///
    /// **When returned:** [`crate::config::HeapConfig::validate`] rejects the configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MemoryError {
    /// True for [`MemoryError::OutOfMemory`]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, MemoryError::OutOfMemory { .. })
    }
}

impl From<crate::config::ConfigError> for MemoryError {
    fn from(err: crate::config::ConfigError) -> Self {
        MemoryError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        MemoryError::HeapInitialization(err.to_string())
    }
}

/// Result type alias for memory manager operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Panic with the violated invariant as context
///
/// Used for conditions that can only arise from a runtime or code generator
/// bug. Across the C ABI the panic aborts the process.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $context:expr) => {
        if !$cond {
            panic!("invariant violated at {}: {}", stringify!($cond), $context);
        }
    };
    ($cond:expr, $context:expr, $($arg:tt)*) => {
        if !$cond {
            panic!("invariant violated at {}: {}", stringify!($cond), format!($context, $($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_display() {
        let err = MemoryError::OutOfMemory {
            requested: 64,
            available: 8,
        };
        assert!(err.is_out_of_memory());
        assert_eq!(
            err.to_string(),
            "Out of memory: requested 64 bytes, available 8 bytes"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: MemoryError = crate::config::ConfigError::ZeroZapValue.into();
        assert!(!err.is_out_of_memory());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn test_invariant_macro_panics() {
        let value = 3usize;
        invariant!(value % 2 == 0, "value {} must be even", value);
    }
}
