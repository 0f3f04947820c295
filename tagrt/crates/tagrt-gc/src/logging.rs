//! GC Event Log
//!
//! Free-form diagnostics go through the `log` facade (`debug!` per cycle,
//! `trace!` per moved object and per root, `warn!`/`error!` for unusual
//! outcomes); the embedding program picks the backend.
//!
//! Alongside it, every collection records structured [`GcEvent`]s in a
//! bounded, process-wide [`EventLog`]. With console output enabled each event
//! is also echoed to stderr, as text or as a JSON line:
//!
//! ```text
//! [2026-01-05 10:12:01.337] gc #3 start: allocation of 48 bytes
//! {"type":"cycle_end","cycle":3,"duration_ms":0.021,"objects_copied":12,"reclaimed_bytes":960}
//! ```

use log::Level;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Something the collector did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEvent {
    CycleStart {
        cycle: u64,
        reason: String,
    },
    CycleEnd {
        cycle: u64,
        duration_ms: f64,
        objects_copied: usize,
        reclaimed_bytes: usize,
    },
    /// Occupancy of the current chunk after a flip
    HeapStats {
        used_bytes: usize,
        total_bytes: usize,
        live_objects: usize,
        utilization: f64,
    },
    /// A request that still did not fit after collecting
    AllocationFailure { size: usize, heap_used: usize },
}

impl GcEvent {
    /// Severity used for filtering
    pub fn level(&self) -> Level {
        match self {
            GcEvent::AllocationFailure { .. } => Level::Error,
            GcEvent::CycleStart { .. } | GcEvent::CycleEnd { .. } => Level::Info,
            GcEvent::HeapStats { .. } => Level::Debug,
        }
    }

    /// One JSON object, tagged by `type`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

impl fmt::Display for GcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcEvent::CycleStart { cycle, reason } => write!(f, "gc #{} start: {}", cycle, reason),
            GcEvent::CycleEnd {
                cycle,
                duration_ms,
                objects_copied,
                reclaimed_bytes,
            } => write!(
                f,
                "gc #{} end: {:.3}ms, {} copied, {} bytes reclaimed",
                cycle, duration_ms, objects_copied, reclaimed_bytes
            ),
            GcEvent::HeapStats {
                used_bytes,
                total_bytes,
                live_objects,
                utilization,
            } => write!(
                f,
                "chunk: {}/{} bytes, {} objects ({:.1}%)",
                used_bytes,
                total_bytes,
                live_objects,
                utilization * 100.0
            ),
            GcEvent::AllocationFailure { size, heap_used } => write!(
                f,
                "allocation of {} bytes failed with {} bytes in use",
                size, heap_used
            ),
        }
    }
}

/// How the event log filters, retains and echoes events
#[derive(Debug, Clone)]
pub struct EventLogConfig {
    /// Least severe level that is recorded
    pub min_level: Level,
    /// Echo events to stderr
    pub console: bool,
    /// Echo as JSON lines instead of text
    pub json: bool,
    /// Prefix echoed lines with local time
    pub timestamps: bool,
    /// Retained events; the oldest are evicted first
    pub capacity: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            min_level: Level::Debug,
            console: false,
            json: false,
            timestamps: true,
            capacity: 4096,
        }
    }
}

impl EventLogConfig {
    /// Text echo of cycle boundaries and failures
    pub fn verbose() -> Self {
        Self {
            min_level: Level::Info,
            console: true,
            ..Default::default()
        }
    }
}

/// Bounded ring of recent events
#[derive(Debug, Default)]
pub struct EventLog {
    config: EventLogConfig,
    events: VecDeque<GcEvent>,
    evicted: u64,
}

impl EventLog {
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            config,
            events: VecDeque::new(),
            evicted: 0,
        }
    }

    pub fn record(&mut self, event: GcEvent) {
        if event.level() > self.config.min_level {
            return;
        }
        if self.config.console {
            eprintln!("{}", self.render(&event));
        }
        if self.config.capacity == 0 {
            return;
        }
        while self.events.len() >= self.config.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
    }

    /// Console line for `event` under this log's settings
    pub fn render(&self, event: &GcEvent) -> String {
        let body = if self.config.json {
            event.to_json()
        } else {
            event.to_string()
        };
        if self.config.timestamps {
            format!("[{}] {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), body)
        } else {
            body
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &GcEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events pushed out by the capacity limit
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.evicted = 0;
    }
}

lazy_static::lazy_static! {
    static ref EVENT_LOG: Mutex<EventLog> = Mutex::new(EventLog::default());
}

/// Record an event in the process-wide log
pub fn log_event(event: GcEvent) {
    EVENT_LOG.lock().record(event);
}

/// Replace the process-wide log, dropping what it held
pub fn configure_logger(config: EventLogConfig) {
    *EVENT_LOG.lock() = EventLog::new(config);
}

pub fn get_event_count() -> usize {
    EVENT_LOG.lock().len()
}

/// Copy of the retained events, oldest first
pub fn recent_events() -> Vec<GcEvent> {
    EVENT_LOG.lock().events().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(cycle: u64) -> GcEvent {
        GcEvent::CycleStart {
            cycle,
            reason: "stress".to_string(),
        }
    }

    fn quiet(config: EventLogConfig) -> EventLog {
        EventLog::new(EventLogConfig {
            console: false,
            ..config
        })
    }

    #[test]
    fn test_level_filter() {
        let mut log = quiet(EventLogConfig {
            min_level: Level::Error,
            ..Default::default()
        });
        log.record(start(1));
        log.record(GcEvent::AllocationFailure {
            size: 64,
            heap_used: 1024,
        });
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = quiet(EventLogConfig {
            capacity: 2,
            ..Default::default()
        });
        for cycle in 1..=3 {
            log.record(start(cycle));
        }
        let kept: Vec<GcEvent> = log.events().cloned().collect();
        assert_eq!(kept, vec![start(2), start(3)]);
        assert_eq!(log.evicted(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut log = quiet(EventLogConfig {
            capacity: 0,
            ..Default::default()
        });
        log.record(start(1));
        assert!(log.is_empty());
    }

    #[test]
    fn test_json_line() {
        let json = GcEvent::AllocationFailure {
            size: 24,
            heap_used: 100,
        }
        .to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "allocation_failure");
        assert_eq!(value["size"], 24);
    }

    #[test]
    fn test_render_without_timestamp() {
        let log = quiet(EventLogConfig {
            timestamps: false,
            ..Default::default()
        });
        assert_eq!(log.render(&start(7)), "gc #7 start: stress");
    }

    #[test]
    fn test_render_json_with_timestamp() {
        let log = quiet(EventLogConfig {
            json: true,
            ..Default::default()
        });
        let line = log.render(&start(2));
        assert!(line.starts_with('['));
        assert!(line.ends_with("\"reason\":\"stress\"}"));
    }

    #[test]
    fn test_global_log() {
        log_event(start(1));
        assert!(get_event_count() > 0);
        assert!(!recent_events().is_empty());
    }
}
