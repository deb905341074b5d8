use crate::error::EncodeError;
use aixmon_common::proto::{Label, Sample, TimeSeries, WriteRequest};
use aixmon_common::types::StoredMetric;
use prost::Message;

/// Convert stored samples into write-request series, one single-point series
/// per sample. Labels keep their scraped order and are not de-duplicated.
pub fn stored_metrics_to_series(metrics: &[StoredMetric]) -> Vec<TimeSeries> {
    metrics
        .iter()
        .map(|m| TimeSeries {
            labels: m.labels.iter().map(Label::from).collect(),
            samples: vec![Sample {
                value: m.value,
                timestamp: m.timestamp_ms,
            }],
        })
        .collect()
}

/// Serialize and snappy-compress a write request.
///
/// Returns the compressed body together with the newest sample timestamp in
/// the request (0 when there are no samples).
pub fn build_write_request(series: Vec<TimeSeries>) -> Result<(Vec<u8>, i64), EncodeError> {
    let highest = series
        .iter()
        .filter_map(|ts| ts.samples.first())
        .map(|s| s.timestamp)
        .fold(0, i64::max);

    let request = WriteRequest { timeseries: series };
    let mut buf = Vec::with_capacity(request.encoded_len());
    request.encode(&mut buf)?;

    let compressed = snap::raw::Encoder::new().compress_vec(&buf)?;
    Ok((compressed, highest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aixmon_common::types::Label as StoredLabel;

    fn metric(labels: &[(&str, &str)], timestamp_ms: i64, value: f64) -> StoredMetric {
        StoredMetric {
            labels: labels
                .iter()
                .map(|(n, v)| StoredLabel::new(*n, *v))
                .collect(),
            timestamp_ms,
            value,
        }
    }

    fn decode(body: &[u8]) -> WriteRequest {
        let raw = snap::raw::Decoder::new()
            .decompress_vec(body)
            .expect("snappy block");
        WriteRequest::decode(raw.as_slice()).expect("protobuf")
    }

    #[test]
    fn each_sample_becomes_its_own_series() {
        let batch = vec![
            metric(&[("__name__", "up"), ("job_name", "aix_exporter")], 1_000, 1.0),
            metric(&[("__name__", "up"), ("job_name", "aix_exporter")], 1_000, 0.0),
        ];
        let series = stored_metrics_to_series(&batch);
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|ts| ts.samples.len() == 1));
        assert_eq!(series[1].samples[0].value, 0.0);
    }

    #[test]
    fn labels_keep_scraped_order() {
        let batch = vec![metric(
            &[("zone", "b"), ("__name__", "temp"), ("app", "x")],
            5,
            21.0,
        )];
        let series = stored_metrics_to_series(&batch);
        let names: Vec<&str> = series[0].labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["zone", "__name__", "app"]);
    }

    #[test]
    fn body_is_a_single_snappy_block_of_the_whole_request() {
        let batch = vec![
            metric(&[("__name__", "a")], 10, 1.5),
            metric(&[("__name__", "b")], 30, 2.5),
            metric(&[("__name__", "c")], 20, 3.5),
        ];
        let (body, highest) =
            build_write_request(stored_metrics_to_series(&batch)).expect("encode");
        assert_eq!(highest, 30);

        let request = decode(&body);
        assert_eq!(request.timeseries.len(), 3);
        assert_eq!(request.timeseries[2].labels[0].value, "c");
        assert_eq!(request.timeseries[2].samples[0].timestamp, 20);
    }

    #[test]
    fn encoding_is_deterministic() {
        let batch = vec![
            metric(&[("__name__", "http_requests_total"), ("method", "GET")], 42, 42.0),
            metric(&[("__name__", "http_requests_total"), ("method", "PUT")], 42, 7.0),
        ];
        let first = build_write_request(stored_metrics_to_series(&batch)).expect("encode");
        let second = build_write_request(stored_metrics_to_series(&batch)).expect("encode");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_batch_encodes_to_empty_request() {
        let (body, highest) = build_write_request(Vec::new()).expect("encode");
        assert_eq!(highest, 0);
        assert!(decode(&body).timeseries.is_empty());
    }
}
