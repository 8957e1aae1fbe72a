use crate::buckets::BucketRecord;
use crate::clock::display_bucket_key;
use crate::session::{ReceiveSummary, SendSummary};

/// Receives the per-second records and final summaries of a session, in the order they happen.
pub trait ReportSink: Send {
    fn on_bucket(&mut self, record: &BucketRecord);
    fn on_send_summary(&mut self, summary: &SendSummary);
    fn on_receive_summary(&mut self, summary: &ReceiveSummary);
}

/// Prints a human readable table to stdout
#[derive(Default)]
pub struct TableReportSink {
    header_printed: bool,
}

impl TableReportSink {
    fn ensure_header(&mut self, count_label: &str, size_label: &str) {
        if self.header_printed {
            return;
        }
        println!();
        println!("Results:");
        println!("datetime {} {}", count_label, size_label);
        println!("-------- {} {}", "-".repeat(count_label.len()), "-".repeat(size_label.len()));
        self.header_printed = true;
    }
}

impl ReportSink for TableReportSink {
    fn on_bucket(&mut self, record: &BucketRecord) {
        self.ensure_header("count", "size(bps)");
        println!("{} {} {}", display_bucket_key(&record.bucket_key), thousands(record.count), thousands(record.bits));
    }

    fn on_send_summary(&mut self, summary: &SendSummary) {
        println!();
        println!("Total sent data size(bps): {}", thousands(summary.stats.total_bits()));
        println!("Total sent data count: {}", thousands(summary.stats.count));
        println!("Outcome: {:?}", summary.outcome);
        println!("---");
        self.header_printed = false;
    }

    fn on_receive_summary(&mut self, summary: &ReceiveSummary) {
        println!();
        match summary.peer {
            Some(peer) => {
                println!("From ip: {}", peer.ip());
                println!("Source port: {}", peer.port());
            }
            None => println!("From ip: -"),
        }
        println!("Bind port: {}", summary.bind_port);
        println!("Total received data size(bps): {}", thousands(summary.stats.total_bits()));
        println!("Total received data count: {}", thousands(summary.stats.count));
        println!("Total received data rate: {:.2}%", summary.loss_rate * 100.0);
        println!("Outcome: {:?}", summary.outcome);
        println!("---");
        self.header_printed = false;
    }
}

/// Keeps everything it is given, for inspection after a session
#[derive(Debug, Default)]
pub struct RecordingReportSink {
    pub buckets: Vec<BucketRecord>,
    pub send_summaries: Vec<SendSummary>,
    pub receive_summaries: Vec<ReceiveSummary>,
}

impl ReportSink for RecordingReportSink {
    fn on_bucket(&mut self, record: &BucketRecord) {
        self.buckets.push(record.clone());
    }

    fn on_send_summary(&mut self, summary: &SendSummary) {
        self.send_summaries.push(summary.clone());
    }

    fn on_receive_summary(&mut self, summary: &ReceiveSummary) {
        self.receive_summaries.push(summary.clone());
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0")]
    #[case(999, "999")]
    #[case(1000, "1,000")]
    #[case(123_456, "123,456")]
    #[case(1_234_567, "1,234,567")]
    fn test_thousands(#[case] n: u64, #[case] expected: &str) {
        assert_eq!(thousands(n), expected);
    }
}
