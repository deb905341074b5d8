use crate::Collector;
use anyhow::Result;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use sysinfo::System;

pub struct MemoryCollector {
    system: System,
    inuse: Gauge,
    free: Gauge,
}

impl MemoryCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            system: System::new(),
            inuse: Gauge::with_opts(Opts::new("aix_mem_inuse_bytes", "memory inuse"))?,
            free: Gauge::with_opts(Opts::new("aix_mem_free_bytes", "memory free"))?,
        })
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn descs(&self) -> Vec<Desc> {
        self.inuse
            .desc()
            .into_iter()
            .chain(self.free.desc())
            .cloned()
            .collect()
    }

    fn collect(&mut self) -> Result<Vec<MetricFamily>> {
        self.system.refresh_memory();

        self.inuse.set(self.system.used_memory() as f64);
        self.free.set(self.system.free_memory() as f64);

        let mut families = self.inuse.collect();
        families.extend(self.free.collect());
        Ok(families)
    }
}
