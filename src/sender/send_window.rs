use tracing::debug;

use crate::buckets::{BucketStore, SessionStats};
use crate::report::ReportSink;

/// Buckets the frames a sender has transmitted by their key. A bucket is flushed as soon as a
///  frame with a different key is sent, the remaining ones when the session ends.
#[derive(Debug, Default)]
pub struct SendWindowAggregator {
    buckets: BucketStore,
    last_key: Option<String>,
    stats: SessionStats,
}

impl SendWindowAggregator {
    pub fn on_sent(&mut self, bucket_key: &str, size: usize, sink: &mut dyn ReportSink) {
        match self.last_key.take() {
            Some(last_key) if last_key == bucket_key => {
                self.last_key = Some(last_key);
            }
            Some(last_key) => {
                self.flush(&last_key, sink);
                self.last_key = Some(bucket_key.to_string());
            }
            None => {
                self.last_key = Some(bucket_key.to_string());
            }
        }

        self.buckets.add(bucket_key, size);
    }

    fn flush(&mut self, bucket_key: &str, sink: &mut dyn ReportSink) {
        if let Some(record) = self.buckets.flush(bucket_key) {
            debug!("flushing send bucket {}: {} frames", record.bucket_key, record.count);
            self.stats.add(&record);
            sink.on_bucket(&record);
        }
    }

    /// flushes all pending buckets in the order their keys were first sent, returning the
    ///  session's totals
    pub fn finish(&mut self, sink: &mut dyn ReportSink) -> SessionStats {
        for record in self.buckets.flush_all() {
            debug!("flushing send bucket {} at end of session: {} frames", record.bucket_key, record.count);
            self.stats.add(&record);
            sink.on_bucket(&record);
        }
        self.last_key = None;
        self.stats
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn num_pending(&self) -> usize {
        self.buckets.len()
    }
}
