//! Configuration Module - Heap Parameters
//!
//! The heap is two fixed-size semispaces. Nothing grows at runtime, so the
//! only sizing decision is the chunk size made here.

use crate::util::WORD_SIZE;

/// Heap configuration
///
/// # Examples
///
/// ```rust
/// use tagrt_gc::HeapConfig;
///
/// let config = HeapConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Tiny chunks with a collection before every allocation
/// let config = HeapConfig {
///     chunk_size: 4096,
///     gc_stress: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Size in bytes of each of the two chunks
    ///
    /// Must be at least [`MIN_CHUNK_SIZE`] and a multiple of the word size.
    /// Default: 64 KiB
    pub chunk_size: usize,

    /// Byte pattern written over free chunk memory
    ///
    /// Stale reads of reclaimed memory show up as `0x4141...` instead of
    /// plausible values. Must be non-zero so it is distinct from a zeroed
    /// payload. Default: `0x41`
    pub zap_value: u8,

    /// Force a collection before every collecting allocation
    ///
    /// Flushes out unprotected pointers held across allocating calls.
    /// Default: false
    pub gc_stress: bool,

    /// Print GC events to stderr
    ///
    /// Default: false
    pub verbose: bool,

    /// Record per-cycle statistics
    ///
    /// Default: true
    pub stats_enabled: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            zap_value: DEFAULT_ZAP_VALUE,
            gc_stress: false,
            verbose: false,
            stats_enabled: true,
        }
    }
}

impl HeapConfig {
    /// Configuration with the given chunk size and defaults elsewhere
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize(format!(
                "chunk_size must be >= {} bytes, got {}",
                MIN_CHUNK_SIZE, self.chunk_size
            )));
        }

        if self.chunk_size % WORD_SIZE != 0 {
            return Err(ConfigError::InvalidChunkSize(format!(
                "chunk_size must be a multiple of {} bytes, got {}",
                WORD_SIZE, self.chunk_size
            )));
        }

        if self.zap_value == 0 {
            return Err(ConfigError::ZeroZapValue);
        }

        Ok(())
    }

    /// Create config from environment variables
    ///
    /// Reads `TAGRT_CHUNK_SIZE`, `TAGRT_ZAP_VALUE` (decimal or `0x` hex),
    /// `TAGRT_GC_STRESS` and `TAGRT_VERBOSE`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TAGRT_CHUNK_SIZE") {
            if let Ok(size) = val.trim().parse::<usize>() {
                config.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("TAGRT_ZAP_VALUE") {
            if let Some(zap) = parse_byte(&val) {
                config.zap_value = zap;
            }
        }

        if let Ok(val) = std::env::var("TAGRT_GC_STRESS") {
            config.gc_stress = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("TAGRT_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Invalid zap value: must be non-zero")]
    ZeroZapValue,
}

// ============================================================================
// CONSTANTS & HELPERS
// ============================================================================

const KB: usize = 1024;

/// Default size of each chunk
pub const DEFAULT_CHUNK_SIZE: usize = 64 * KB;

/// Smallest accepted chunk size
pub const MIN_CHUNK_SIZE: usize = 256;

/// Default zap pattern byte
pub const DEFAULT_ZAP_VALUE: u8 = 0x41;

fn parse_flag(val: &str) -> bool {
    let val = val.trim();
    val == "1" || val.eq_ignore_ascii_case("true")
}

fn parse_byte(val: &str) -> Option<u8> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => val.parse::<u8>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.zap_value, 0x41);
        assert!(!config.gc_stress);
        assert!(config.stats_enabled);
    }

    #[test]
    fn test_chunk_too_small() {
        let config = HeapConfig::with_chunk_size(128);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(_))
        ));
    }

    #[test]
    fn test_chunk_not_word_multiple() {
        let config = HeapConfig::with_chunk_size(1027);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_zap_rejected() {
        let config = HeapConfig {
            zap_value: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroZapValue)));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("yes"));
        assert_eq!(parse_byte("0x41"), Some(0x41));
        assert_eq!(parse_byte("65"), Some(65));
        assert_eq!(parse_byte("0x1ff"), None);
        assert_eq!(parse_byte("zap"), None);
    }
}
