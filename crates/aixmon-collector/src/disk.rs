use crate::Collector;
use anyhow::Result;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use sysinfo::Disks;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct DiskCollector {
    disks: Disks,
    free: GaugeVec,
}

impl DiskCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            disks: Disks::new_with_refreshed_list(),
            free: GaugeVec::new(Opts::new("aix_disk_free_mb", "disk free"), &["vg"])?,
        })
    }
}

impl Collector for DiskCollector {
    fn name(&self) -> &str {
        "disk"
    }

    fn descs(&self) -> Vec<Desc> {
        self.free.desc().into_iter().cloned().collect()
    }

    fn collect(&mut self) -> Result<Vec<MetricFamily>> {
        self.disks.refresh_list();
        // Drop series for volumes that are no longer mounted.
        self.free.reset();

        for disk in self.disks.iter() {
            let mount = disk.mount_point().to_string_lossy();
            self.free
                .with_label_values(&[&*mount])
                .set(disk.available_space() as f64 / BYTES_PER_MB);
        }

        Ok(self.free.collect())
    }
}
