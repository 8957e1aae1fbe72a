use tracing::debug;

use crate::buckets::{BucketStore, SessionStats};
use crate::report::ReportSink;

/// Buckets received frames by key, keeping up to `window` buckets open at the same time. Frames
///  arriving late (i.e. after frames of a newer bucket) are still attributed to their own bucket
///  as long as that bucket is within the window.
#[derive(Debug)]
pub struct RecvWindowAggregator {
    window: usize,
    buckets: BucketStore,
    stats: SessionStats,
}

impl RecvWindowAggregator {
    pub fn new(window: usize) -> RecvWindowAggregator {
        RecvWindowAggregator {
            window: window.max(1),
            buckets: BucketStore::default(),
            stats: SessionStats::default(),
        }
    }

    pub fn on_received(&mut self, bucket_key: &str, size: usize, sink: &mut dyn ReportSink) {
        if !self.buckets.contains(bucket_key) {
            while self.buckets.len() >= self.window {
                match self.buckets.flush_oldest() {
                    Some(record) => {
                        debug!("flushing receive bucket {}: {} frames", record.bucket_key, record.count);
                        self.stats.add(&record);
                        sink.on_bucket(&record);
                    }
                    None => break,
                }
            }
        }

        self.buckets.add(bucket_key, size);
    }

    /// flushes all pending buckets in insertion order, returning the session's totals
    pub fn finish(&mut self, sink: &mut dyn ReportSink) -> SessionStats {
        for record in self.buckets.flush_all() {
            debug!("flushing receive bucket {} at end of session: {} frames", record.bucket_key, record.count);
            self.stats.add(&record);
            sink.on_bucket(&record);
        }
        self.stats
    }

    pub fn num_pending(&self) -> usize {
        self.buckets.len()
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::BucketRecord;
    use crate::report::RecordingReportSink;
    use rstest::rstest;

    fn record(key: &str, count: u64, bytes: u64) -> BucketRecord {
        BucketRecord { bucket_key: key.to_string(), count, bits: bytes * 8 }
    }

    #[test]
    fn test_late_frame_within_window() {
        let mut sink = RecordingReportSink::default();
        let mut aggregator = RecvWindowAggregator::new(2);

        aggregator.on_received("01", 100, &mut sink);
        aggregator.on_received("02", 100, &mut sink);
        aggregator.on_received("01", 100, &mut sink);
        assert!(sink.buckets.is_empty());
        assert_eq!(aggregator.pending_keys().collect::<Vec<_>>(), vec!["01", "02"]);

        aggregator.on_received("03", 100, &mut sink);
        assert_eq!(sink.buckets, vec![record("01", 2, 200)]);
        assert_eq!(aggregator.pending_keys().collect::<Vec<_>>(), vec!["02", "03"]);

        let stats = aggregator.finish(&mut sink);
        assert_eq!(sink.buckets, vec![record("01", 2, 200), record("02", 1, 100), record("03", 1, 100)]);
        assert_eq!(stats, SessionStats { count: 4, total_bytes: 400 });
    }

    #[test]
    fn test_frame_later_than_window_opens_new_bucket() {
        let mut sink = RecordingReportSink::default();
        let mut aggregator = RecvWindowAggregator::new(2);

        aggregator.on_received("01", 10, &mut sink);
        aggregator.on_received("02", 10, &mut sink);
        aggregator.on_received("03", 10, &mut sink);
        aggregator.on_received("01", 10, &mut sink);
        aggregator.finish(&mut sink);

        assert_eq!(sink.buckets, vec![record("01", 1, 10), record("02", 1, 10), record("03", 1, 10), record("01", 1, 10)]);
    }

    #[rstest]
    #[case::window_1(1)]
    #[case::window_2(2)]
    #[case::window_3(3)]
    #[case::window_5(5)]
    fn test_window_bound_and_conservation(#[case] window: usize) {
        let mut sink = RecordingReportSink::default();
        let mut aggregator = RecvWindowAggregator::new(window);

        let keys = ["01", "02", "01", "03", "02", "04", "04", "05", "03", "06", "06", "07"];
        for key in keys {
            aggregator.on_received(key, 50, &mut sink);
            assert!(aggregator.num_pending() <= window);
        }
        let stats = aggregator.finish(&mut sink);

        assert_eq!(stats.count, keys.len() as u64);
        assert_eq!(sink.buckets.iter().map(|r| r.count).sum::<u64>(), keys.len() as u64);
        assert_eq!(aggregator.num_pending(), 0);
    }
}
