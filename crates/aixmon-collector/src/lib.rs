//! Host metric collection for the aixmon agent.
//!
//! Each [`Collector`] owns the gauges for one category of host readings (CPU,
//! memory, disk) and refreshes them on demand. [`HostMetrics`] adapts a set of
//! collectors to [`prometheus::core::Collector`] so they can be registered in
//! a [`prometheus::Registry`] and served in the text exposition format.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod noop;

use anyhow::Result;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::sync::{Mutex, PoisonError};

/// A source of host readings.
///
/// The trait mirrors the describe/collect contract of a pull-based metric
/// source: [`Collector::descs`] names every metric the collector can produce
/// and [`Collector::collect`] reads current values from the platform.
pub trait Collector: Send {
    /// Returns the collector name (e.g., `"cpu"`, `"disk"`), used for logging.
    fn name(&self) -> &str;

    /// Descriptors of every metric family this collector emits.
    fn descs(&self) -> Vec<Desc>;

    /// Refreshes platform readings and returns the current metric families.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<MetricFamily>>;
}

/// Which host collectors to enable.
#[derive(Debug, Clone, Copy)]
pub struct CollectorOptions {
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            cpu: true,
            memory: true,
            disk: true,
        }
    }
}

/// Build the collectors for the current platform.
///
/// Platforms sysinfo cannot read get a single no-op collector so the rest of
/// the agent runs unchanged.
pub fn host_collectors(options: CollectorOptions) -> Result<Vec<Box<dyn Collector>>> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        tracing::warn!("Host metrics are not supported on this platform, exporting none");
        return Ok(vec![Box::new(noop::NoopCollector)]);
    }

    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
    if options.cpu {
        collectors.push(Box::new(cpu::CpuCollector::new()?));
    }
    if options.memory {
        collectors.push(Box::new(memory::MemoryCollector::new()?));
    }
    if options.disk {
        collectors.push(Box::new(disk::DiskCollector::new()?));
    }
    Ok(collectors)
}

/// Registry adapter over a set of host collectors.
pub struct HostMetrics {
    descs: Vec<Desc>,
    collectors: Vec<Mutex<Box<dyn Collector>>>,
}

impl HostMetrics {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        let descs = collectors.iter().flat_map(|c| c.descs()).collect();
        Self {
            descs,
            collectors: collectors.into_iter().map(Mutex::new).collect(),
        }
    }
}

impl prometheus::core::Collector for HostMetrics {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        for collector in &self.collectors {
            let mut collector = collector.lock().unwrap_or_else(PoisonError::into_inner);
            match collector.collect() {
                Ok(collected) => families.extend(collected),
                Err(e) => {
                    tracing::warn!(collector = collector.name(), error = %e, "Collection failed")
                }
            }
        }
        families
    }
}
