use crate::Collector;
use anyhow::Result;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use sysinfo::System;

/// Per-core CPU time split by mode, as usage percentages.
///
/// sysinfo only reports a combined busy figure, so `sys` and `wait` stay at
/// zero and the busy share is reported under `user`.
pub struct CpuCollector {
    system: System,
    ticks: GaugeVec,
}

impl CpuCollector {
    pub fn new() -> Result<Self> {
        let ticks = GaugeVec::new(
            Opts::new("aix_cpu_ticks_total", "cpu seconds running by name"),
            &["cpu", "mode"],
        )?;
        let mut system = System::new();
        system.refresh_cpu_all();
        Ok(Self { system, ticks })
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn descs(&self) -> Vec<Desc> {
        self.ticks.desc().into_iter().cloned().collect()
    }

    fn collect(&mut self) -> Result<Vec<MetricFamily>> {
        self.system.refresh_cpu_all();

        for cpu in self.system.cpus() {
            let busy = f64::from(cpu.cpu_usage()).clamp(0.0, 100.0);
            let name = cpu.name();
            self.ticks.with_label_values(&[name, "user"]).set(busy);
            self.ticks.with_label_values(&[name, "sys"]).set(0.0);
            self.ticks.with_label_values(&[name, "wait"]).set(0.0);
            self.ticks.with_label_values(&[name, "idle"]).set(100.0 - busy);
        }

        Ok(self.ticks.collect())
    }
}
