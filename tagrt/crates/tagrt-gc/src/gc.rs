//! GC Module - Stop-the-world semispace collection
//!
//! One cycle:
//!
//! 1. Gather roots from the root provider (normally the frame walker) and
//!    from every live [`crate::TemporaryHandle`].
//! 2. Evacuate everything reachable into the other chunk.
//! 3. Swap chunk roles; reset and zap the chunk that was current.
//!
//! A cycle cannot fail. Running out of room in the other chunk would mean
//! more live data than a chunk holds, which the allocator never produces,
//! so it is treated as a broken invariant.

use crate::heap::{Heap, StackRoots};
use crate::logging::{self, GcEvent};
use crate::relocate::Evacuator;
use crate::roots::RootProvider;
use crate::stats::{CycleStats, GcTimer};
use crate::util::Address;

/// Why a collection ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcReason {
    /// An allocation did not fit
    AllocationFailure { requested: usize },
    /// Stress mode collects before every allocation
    Stress,
    /// Requested by the caller
    Explicit,
}

impl std::fmt::Display for GcReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcReason::AllocationFailure { requested } => {
                write!(f, "allocation of {} bytes", requested)
            },
            GcReason::Stress => write!(f, "stress"),
            GcReason::Explicit => write!(f, "explicit"),
        }
    }
}

impl Heap {
    /// Collect with the generated frames in `[stack_low, stack_high]` as roots
    ///
    /// # Panics
    ///
    /// If no stack high bound was recorded.
    pub fn collect(&mut self, stack_low: Address) -> CycleStats {
        let walker = StackRoots {
            low: stack_low,
            high: self.stack_high,
        };
        self.collect_for(&walker, GcReason::Explicit)
    }

    /// Collect with an arbitrary root provider plus the live handles
    pub fn collect_with(&mut self, roots: &dyn RootProvider) -> CycleStats {
        self.collect_for(roots, GcReason::Explicit)
    }

    pub(crate) fn collect_for(&mut self, roots: &dyn RootProvider, reason: GcReason) -> CycleStats {
        let timer = GcTimer::new();
        let cycle = self.cycles + 1;
        let used_before = self.current.used();
        let objects_before = self.current.table().len();

        log::debug!(
            "gc cycle {} starting ({}): {} bytes, {} objects",
            cycle,
            reason,
            used_before,
            objects_before
        );
        logging::log_event(GcEvent::CycleStart {
            cycle,
            reason: reason.to_string(),
        });

        let evacuation = {
            let mut evacuator = Evacuator::new(&mut self.current, &mut self.other);
            evacuator.add_roots(roots);
            evacuator.add_roots(&self.handles);
            evacuator.run()
        };

        self.flip();
        self.cycles = cycle;

        let stats = CycleStats {
            cycle,
            roots_discovered: evacuation.roots,
            objects_copied: evacuation.objects_copied,
            bytes_copied: evacuation.bytes_copied,
            bytes_reclaimed: used_before.saturating_sub(self.current.used()),
            objects_reclaimed: objects_before - evacuation.objects_copied,
            duration: timer.elapsed(),
        };

        log::debug!("gc {}", stats);
        if stats.objects_reclaimed == 0 && matches!(reason, GcReason::AllocationFailure { .. }) {
            log::warn!(
                "gc cycle {} reclaimed nothing; all {} objects are reachable",
                cycle,
                objects_before
            );
        }

        logging::log_event(GcEvent::CycleEnd {
            cycle,
            duration_ms: timer.elapsed_ms(),
            objects_copied: stats.objects_copied,
            reclaimed_bytes: stats.bytes_reclaimed,
        });
        let heap = self.stats();
        logging::log_event(GcEvent::HeapStats {
            used_bytes: heap.used_bytes,
            total_bytes: heap.capacity_bytes,
            live_objects: heap.live_objects,
            utilization: heap.utilization,
        });

        if self.config.stats_enabled {
            self.last_cycle = Some(stats);
        }
        stats
    }

    /// Make the to-chunk current and wipe the old one
    fn flip(&mut self) {
        std::mem::swap(&mut self.current, &mut self.other);
        self.other.reset();
    }
}
