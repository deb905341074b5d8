/// Reserved label carrying the metric name of a series.
pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Set a label in place, keeping label names unique within the set.
///
/// An existing label with the same name keeps its position and takes the new
/// value; otherwise the label is appended.
///
/// # Examples
///
/// ```
/// use aixmon_common::types::{set_label, Label};
///
/// let mut labels = vec![Label::new("method", "GET")];
/// set_label(&mut labels, "job_name", "aix_exporter");
/// set_label(&mut labels, "method", "POST");
/// assert_eq!(labels.len(), 2);
/// assert_eq!(labels[0], Label::new("method", "POST"));
/// assert_eq!(labels[1].name, "job_name");
/// ```
pub fn set_label(labels: &mut Vec<Label>, name: &str, value: &str) {
    match labels.iter_mut().find(|l| l.name == name) {
        Some(existing) => existing.value = value.to_string(),
        None => labels.push(Label::new(name, value)),
    }
}

/// One scraped sample awaiting delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMetric {
    pub labels: Vec<Label>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub value: f64,
}

impl StoredMetric {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

/// All samples produced by a single scrape cycle.
pub type Batch = Vec<StoredMetric>;
