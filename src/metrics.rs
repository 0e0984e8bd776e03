//! Unit metrics record and memory sampling.

use serde::{Deserialize, Serialize};

/// Name and version pair identifying a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unit name.
    pub name: String,
    /// Unit version.
    pub version: String,
}

/// Memory usage deltas for a unit.
///
/// Each field holds the difference since the previous sample, not an
/// absolute value — see [`UnitMetrics::apply_sample`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemUsage {
    /// Heap bytes delta.
    pub heap: u64,
    /// Heap-allocated bytes delta.
    pub heap_alloc: u64,
    /// Cumulative total allocation delta.
    pub total: u64,
}

/// Workload counters and resource usage for one unit instance.
///
/// Mutated under a single exclusive lock owned by the unit core; callers
/// only ever see clones (snapshot isolation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitMetrics {
    /// Unit name and version, set once at initialization.
    pub identity: Identity,
    /// Memory usage deltas since the previous sample.
    pub mem_usage: MemUsage,
    /// Requests handled successfully. Monotonic, never reset.
    pub requests_handled: u32,
    /// Requests that failed. Monotonic, never reset.
    pub requests_failed: u32,
    /// Currently active executions. Never goes negative.
    pub active: u16,
    /// Concurrent routines owned by this unit.
    pub routines: u16,
}

impl UnitMetrics {
    /// Create a fresh record for the named unit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                name: name.into(),
                version: String::new(),
            },
            ..Self::default()
        }
    }

    /// Fold an absolute memory reading into the stored deltas.
    ///
    /// Each field is overwritten with `reading - stored`, and that
    /// difference becomes the baseline for the next call. Repeated calls
    /// without intervening allocation activity therefore show shrinking or
    /// oscillating deltas; this is an approximate activity-since-last-sample
    /// signal, not an absolute gauge. Wrapping subtraction because the
    /// stored baseline may exceed the fresh reading.
    pub fn apply_sample(&mut self, sample: MemSample) {
        self.mem_usage.heap = fold_sample(self.mem_usage.heap, sample.heap);
        self.mem_usage.heap_alloc = fold_sample(self.mem_usage.heap_alloc, sample.heap_alloc);
        self.mem_usage.total = fold_sample(self.mem_usage.total, sample.total);
    }
}

/// The delta aggregation formula, kept in one place so it can be swapped
/// without touching callers.
#[inline]
fn fold_sample(stored: u64, reading: u64) -> u64 {
    reading.wrapping_sub(stored)
}

/// An absolute process-wide memory reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemSample {
    /// Heap bytes currently allocated.
    pub heap: u64,
    /// Heap-allocated bytes.
    pub heap_alloc: u64,
    /// Cumulative total bytes allocated.
    pub total: u64,
}

/// Source of absolute memory readings.
///
/// The unit core calls this at initialization and on every status query;
/// implementations should be cheap and must never block on I/O beyond a
/// proc read.
pub trait MemorySource: Send {
    /// Take an absolute reading of process memory counters.
    fn sample(&mut self) -> MemSample;
}

/// A memory source that always reads zero.
///
/// Used when the `system-memory` feature is disabled, and in tests that
/// need deterministic samples.
#[derive(Debug, Default)]
pub struct NullMemory;

impl MemorySource for NullMemory {
    fn sample(&mut self) -> MemSample {
        MemSample::default()
    }
}

/// Memory source backed by the `sysinfo` crate.
///
/// Maps resident set size to the heap field, virtual size to heap_alloc,
/// and accumulates resident readings for the cumulative total.
#[cfg(feature = "system-memory")]
pub struct SysinfoMemory {
    system: sysinfo::System,
    pid: Option<sysinfo::Pid>,
    cumulative: u64,
}

#[cfg(feature = "system-memory")]
impl SysinfoMemory {
    /// Create a source bound to the current process.
    pub fn new() -> Self {
        Self {
            system: sysinfo::System::new(),
            pid: sysinfo::get_current_pid().ok(),
            cumulative: 0,
        }
    }
}

#[cfg(feature = "system-memory")]
impl Default for SysinfoMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "system-memory")]
impl MemorySource for SysinfoMemory {
    fn sample(&mut self) -> MemSample {
        let Some(pid) = self.pid else {
            return MemSample::default();
        };
        self.system
            .refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);

        match self.system.process(pid) {
            Some(proc) => {
                let resident = proc.memory();
                self.cumulative = self.cumulative.wrapping_add(resident);
                MemSample {
                    heap: resident,
                    heap_alloc: proc.virtual_memory(),
                    total: self.cumulative,
                }
            }
            None => MemSample::default(),
        }
    }
}

#[cfg(feature = "system-memory")]
impl std::fmt::Debug for SysinfoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoMemory")
            .field("pid", &self.pid)
            .field("cumulative", &self.cumulative)
            .finish()
    }
}

/// Construct the default memory source for this build.
pub fn default_memory_source() -> Box<dyn MemorySource> {
    #[cfg(feature = "system-memory")]
    {
        Box::new(SysinfoMemory::new())
    }
    #[cfg(not(feature = "system-memory"))]
    {
        Box::new(NullMemory)
    }
}
