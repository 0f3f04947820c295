//! Heap Module - Two semispaces and the allocator
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ current chunk        │   │ other chunk          │
//! │ objects + table      │   │ zapped, empty        │
//! └──────────────────────┘   └──────────────────────┘
//!            │       collection copies survivors →      │
//!            └──────────── roles swap afterwards ───────┘
//! ```
//!
//! Allocation bumps the current chunk. When a request does not fit the heap
//! collects once and retries once; a second miss is out of memory.

pub mod chunk;

pub use chunk::Chunk;

use crate::config::HeapConfig;
use crate::error::{MemoryError, Result};
use crate::gc::GcReason;
use crate::logging::{self, EventLogConfig, GcEvent};
use crate::roots::{FrameWalker, HandleRegistry, RootProvider, TemporaryHandle};
use crate::stats::{CycleStats, HeapStats};
use crate::util::{Address, Alignment, Word};
use indexmap::IndexMap;

/// Heap - the memory manager's single owned aggregate
pub struct Heap {
    pub(crate) current: Chunk,
    pub(crate) other: Chunk,
    pub(crate) config: HeapConfig,
    pub(crate) handles: HandleRegistry,
    pub(crate) stack_high: Option<Address>,
    pub(crate) cycles: u64,
    pub(crate) last_cycle: Option<CycleStats>,
}

impl Heap {
    /// Map both chunks and fill them with the zap pattern
    pub fn new(config: HeapConfig) -> Result<Self> {
        config.validate()?;

        let current = Chunk::new(config.chunk_size, config.zap_value)?;
        let other = Chunk::new(config.chunk_size, config.zap_value)?;

        if config.verbose {
            logging::configure_logger(EventLogConfig::verbose());
        }

        log::debug!(
            "heap initialized: two {} byte chunks at {:#x} and {:#x}",
            config.chunk_size,
            current.start(),
            other.start()
        );

        Ok(Self {
            current,
            other,
            config,
            handles: HandleRegistry::new(),
            stack_high: None,
            cycles: 0,
            last_cycle: None,
        })
    }

    /// Heap with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(HeapConfig::default())
    }

    /// Record the frame base of the outermost generated frame
    pub fn set_stack_high(&mut self, stack_high: Address) {
        self.stack_high = Some(stack_high);
    }

    pub fn stack_high(&self) -> Option<Address> {
        self.stack_high
    }

    /// Allocate `size` bytes, collecting with the frames in
    /// `[stack_low, stack_high]` as roots if needed
    ///
    /// # Panics
    ///
    /// If a collection is needed and no stack high bound was recorded.
    pub fn allocate(&mut self, size: usize, stack_low: Address) -> Result<Address> {
        let walker = StackRoots {
            low: stack_low,
            high: self.stack_high,
        };
        self.allocate_with(size, &walker)
    }

    /// Allocate `size` bytes, collecting with `roots` if needed
    ///
    /// A size that overflows when rounded to words is out of memory at once,
    /// without collecting.
    pub fn allocate_with(&mut self, size: usize, roots: &dyn RootProvider) -> Result<Address> {
        let byte_size = match Alignment::align_word(size) {
            Some(byte_size) => byte_size,
            None => return Err(self.out_of_memory(size)),
        };

        if self.config.gc_stress {
            self.collect_for(roots, GcReason::Stress);
        }

        if let Some(base) = self.current.try_bump(byte_size) {
            return Ok(base);
        }

        log::debug!("{} bytes do not fit in the current chunk", byte_size);
        self.collect_for(roots, GcReason::AllocationFailure { requested: byte_size });

        if let Some(base) = self.current.try_bump(byte_size) {
            return Ok(base);
        }

        Err(self.out_of_memory(byte_size))
    }

    /// Allocate without ever collecting
    ///
    /// Used before any generated frame exists (the main context).
    pub fn allocate_no_gc(&mut self, size: usize) -> Result<Address> {
        let byte_size = match Alignment::align_word(size) {
            Some(byte_size) => byte_size,
            None => return Err(self.out_of_memory(size)),
        };
        match self.current.try_bump(byte_size) {
            Some(base) => Ok(base),
            None => Err(self.out_of_memory(byte_size)),
        }
    }

    pub(crate) fn out_of_memory(&self, byte_size: usize) -> MemoryError {
        let available = self.current.available();
        log::error!(
            "out of memory: {} bytes requested, {} available",
            byte_size,
            available
        );
        logging::log_event(GcEvent::AllocationFailure {
            size: byte_size,
            heap_used: self.current.used(),
        });
        MemoryError::OutOfMemory {
            requested: byte_size,
            available,
        }
    }

    /// Protect a tagged pointer held in a native local
    pub fn protect(&self, value: Word) -> TemporaryHandle {
        TemporaryHandle::new(&self.handles, value)
    }

    /// Registry that temporary handles of this heap register with
    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Resolve an untagged address to `(base, offset)` in the current chunk
    pub fn find_object(&self, addr: Address) -> Option<(Address, usize)> {
        if !self.current.contains(addr) {
            return None;
        }
        self.current.table().find(addr)
    }

    /// True if `addr` is exactly the base of a live object
    pub fn is_live_object(&self, addr: Address) -> bool {
        matches!(self.find_object(addr), Some((base, 0)) if base == addr)
    }

    /// True if `addr` lies in the current chunk
    pub fn contains(&self, addr: Address) -> bool {
        self.current.contains(addr)
    }

    pub fn current_chunk(&self) -> &Chunk {
        &self.current
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn set_gc_stress(&mut self, enabled: bool) {
        self.config.gc_stress = enabled;
    }

    pub fn gc_stress(&self) -> bool {
        self.config.gc_stress
    }

    /// Completed collections
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Statistics of the most recent collection
    pub fn last_cycle(&self) -> Option<&CycleStats> {
        self.last_cycle.as_ref()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats::new(
            self.current.used(),
            self.current.capacity(),
            self.current.table().len(),
        )
    }

    /// Ordered key/value summary for debugging output
    pub fn diagnostics(&self) -> IndexMap<String, String> {
        let stats = self.stats();
        let mut info = IndexMap::new();
        info.insert("cycles".to_string(), self.cycles.to_string());
        info.insert("used_bytes".to_string(), stats.used_bytes.to_string());
        info.insert("capacity_bytes".to_string(), stats.capacity_bytes.to_string());
        info.insert("live_objects".to_string(), stats.live_objects.to_string());
        info.insert(
            "utilization".to_string(),
            format!("{:.1}%", stats.utilization * 100.0),
        );
        info.insert("handles".to_string(), self.handles.len().to_string());
        info.insert("gc_stress".to_string(), self.config.gc_stress.to_string());
        info.insert(
            "stack_high".to_string(),
            match self.stack_high {
                Some(high) => format!("{:#x}", high),
                None => "unset".to_string(),
            },
        );
        info
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("current", &self.current)
            .field("other", &self.other)
            .field("cycles", &self.cycles)
            .finish()
    }
}

/// Frame walker whose high bound is checked only when roots are needed
pub(crate) struct StackRoots {
    pub(crate) low: Address,
    pub(crate) high: Option<Address>,
}

impl RootProvider for StackRoots {
    fn collect_roots(&self, roots: &mut Vec<crate::roots::Root>) {
        let high = match self.high {
            Some(high) => high,
            None => panic!("invariant violated: collection before the stack high bound was set"),
        };
        FrameWalker::new(self.low, high).collect_roots(roots);
    }
}
