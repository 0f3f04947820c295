//! Stats Module - Collection and occupancy figures

pub mod timer;

pub use timer::GcTimer;

use std::time::Duration;

/// Outcome of one collection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    /// 1-based cycle number
    pub cycle: u64,
    /// Roots found on the stack and in handles
    pub roots_discovered: usize,
    /// Objects that survived
    pub objects_copied: usize,
    /// Header and payload bytes of the survivors
    pub bytes_copied: usize,
    /// Chunk bytes in use before minus after
    pub bytes_reclaimed: usize,
    /// Objects left behind
    pub objects_reclaimed: usize,
    pub duration: Duration,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycle {}: {} roots, {} objects copied ({} bytes), {} bytes reclaimed in {:?}",
            self.cycle,
            self.roots_discovered,
            self.objects_copied,
            self.bytes_copied,
            self.bytes_reclaimed,
            self.duration
        )
    }
}

/// Occupancy of the current chunk
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeapStats {
    pub used_bytes: usize,
    pub capacity_bytes: usize,
    pub live_objects: usize,
    /// `used_bytes / capacity_bytes`
    pub utilization: f64,
}

impl HeapStats {
    pub fn new(used_bytes: usize, capacity_bytes: usize, live_objects: usize) -> Self {
        let utilization = if capacity_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / capacity_bytes as f64
        };
        Self {
            used_bytes,
            capacity_bytes,
            live_objects,
            utilization,
        }
    }
}

impl std::fmt::Display for HeapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} bytes, {} objects ({:.1}% full)",
            self.used_bytes,
            self.capacity_bytes,
            self.live_objects,
            self.utilization * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_stats_utilization() {
        let stats = HeapStats::new(256, 1024, 3);
        assert_eq!(stats.utilization, 0.25);
        assert_eq!(stats.to_string(), "256/1024 bytes, 3 objects (25.0% full)");
    }

    #[test]
    fn test_empty_capacity() {
        assert_eq!(HeapStats::new(0, 0, 0).utilization, 0.0);
    }
}
