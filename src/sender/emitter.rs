use std::sync::Arc;

use bytes::BytesMut;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::clock::{bucket_key, wait_for_second_boundary, WallClock};
use crate::config::SenderConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::frame::{encode, ControlHeader};
use crate::report::ReportSink;
use crate::sender::rate_limit::SecondBudget;
use crate::sender::send_window::SendWindowAggregator;
use crate::session::{send_end_markers, SendOutcome, SendSummary};
use crate::socket::{bind_for_destination, release, DatagramSocket};

/// a frame that was created but not yet admitted - it keeps the bucket key of its creation time
struct PendingFrame {
    bucket_key: String,
    buf: BytesMut,
}

/// Sends padded frames to a destination for a fixed duration, never exceeding the configured
///  bitrate within any second of the session.
pub struct Emitter {
    config: Arc<SenderConfig>,
    clock: Arc<dyn WallClock>,
}

impl Emitter {
    pub fn new(config: Arc<SenderConfig>, clock: Arc<dyn WallClock>) -> Emitter {
        Emitter { config, clock }
    }

    /// Runs a complete send session on a freshly bound socket. Configuration errors are reported
    ///  before the socket is opened; the socket is released on every path out of the session.
    pub async fn run(&self, sink: &mut dyn ReportSink, cancel: &CancellationToken) -> ProbeResult<SendSummary> {
        self.config.validate()?;

        let socket = bind_for_destination(self.config.destination).await?;
        let result = self.run_on(&socket, sink, cancel).await;
        release(socket);
        result
    }

    pub async fn run_on(&self, socket: &dyn DatagramSocket, sink: &mut dyn ReportSink, cancel: &CancellationToken) -> ProbeResult<SendSummary> {
        let config = self.config.as_ref();
        info!(destination = ?config.destination, max_mbps = config.max_bitrate_mbps, duration = ?config.duration, mtu = config.mtu, "starting send session");

        if let Some(threshold) = config.alignment_threshold {
            if !wait_for_second_boundary(self.clock.as_ref(), threshold, config.alignment_poll_interval, cancel).await {
                info!("cancelled before the first frame");
                return Ok(self.finish(SendOutcome::Cancelled, &mut SendWindowAggregator::default(), sink));
            }
        }

        let mut aggregator = SendWindowAggregator::default();
        let outcome = self.send_loop(socket, &mut aggregator, sink, cancel).await?;
        let summary = self.finish(outcome, &mut aggregator, sink);

        if summary.outcome == SendOutcome::Completed {
            let end_marker = ControlHeader::end_marker(bucket_key(self.clock.now()), summary.stats.count);
            send_end_markers(socket, config.destination, &end_marker, config.mtu, config.end_marker_repeats, config.end_marker_interval).await;
        }
        else {
            info!("session ended with {:?} - not sending an end marker", summary.outcome);
        }

        Ok(summary)
    }

    async fn send_loop(
        &self,
        socket: &dyn DatagramSocket,
        aggregator: &mut SendWindowAggregator,
        sink: &mut dyn ReportSink,
        cancel: &CancellationToken,
    ) -> ProbeResult<SendOutcome> {
        let config = self.config.as_ref();
        let frame_bits = config.mtu as u64 * 8;

        let mut budget = SecondBudget::new(config.max_bits_per_second());
        let mut pending: Option<PendingFrame> = None;
        let mut is_first = true;

        let start = Instant::now();
        while start.elapsed() < config.duration {
            if cancel.is_cancelled() {
                info!("send session cancelled");
                return Ok(SendOutcome::Cancelled);
            }

            if budget.advance_to(start.elapsed()) {
                trace!("new second, budget cleared");
            }

            let frame = match pending.take() {
                Some(frame) => frame,
                None => {
                    let bucket_key = bucket_key(self.clock.now());
                    let buf = encode(&ControlHeader::data(bucket_key.as_str(), is_first), config.mtu)?;
                    is_first = false;
                    PendingFrame { bucket_key, buf }
                }
            };

            if !budget.admits(frame_bits) {
                pending = Some(frame);
                tokio::time::sleep(config.admission_retry_delay).await;
                continue;
            }

            match socket.send_to(&frame.buf, config.destination).await {
                Ok(n) if n == frame.buf.len() => {
                    budget.record(n as u64 * 8);
                    aggregator.on_sent(&frame.bucket_key, n, sink);
                }
                Ok(n) => {
                    let e = ProbeError::ShortWrite { sent: n, expected: frame.buf.len() };
                    error!("aborting send session: {}", e);
                    return Ok(SendOutcome::TransmitFailed);
                }
                Err(e) => {
                    error!("aborting send session: {}", ProbeError::Transmit(e));
                    return Ok(SendOutcome::TransmitFailed);
                }
            }
        }

        debug!("send duration of {:?} elapsed", config.duration);
        Ok(SendOutcome::Completed)
    }

    fn finish(&self, outcome: SendOutcome, aggregator: &mut SendWindowAggregator, sink: &mut dyn ReportSink) -> SendSummary {
        let summary = SendSummary {
            outcome,
            stats: aggregator.finish(sink),
        };
        sink.on_send_summary(&summary);
        summary
    }
}
