use crate::Collector;
use anyhow::Result;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;

/// Stand-in collector for platforms without host metric support.
pub struct NoopCollector;

impl Collector for NoopCollector {
    fn name(&self) -> &str {
        "noop"
    }

    fn descs(&self) -> Vec<Desc> {
        Vec::new()
    }

    fn collect(&mut self) -> Result<Vec<MetricFamily>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_nothing() {
        let mut collector = NoopCollector;
        assert!(collector.descs().is_empty());
        assert!(collector.collect().expect("collect").is_empty());
    }
}
