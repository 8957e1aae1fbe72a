use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::select;
use tokio::time::{error::Elapsed, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ReceiverConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::frame::decode;
use crate::receiver::recv_window::RecvWindowAggregator;
use crate::report::ReportSink;
use crate::session::{loss_rate, ReceiveOutcome, ReceiveSummary};
use crate::socket::{bind, release, DatagramSocket};

/// what a single (timed) receive call came back with
#[derive(Debug)]
enum RecvEvent {
    Datagram { len: usize, from: SocketAddr },
    /// nothing arrived within the timeout - routine, the loop just carries on
    Timeout,
    /// an error that says nothing about the socket's health, e.g. an ICMP 'port unreachable'
    ///  echo of an earlier send
    Transient(io::Error),
    Fatal(io::Error),
}

impl RecvEvent {
    fn classify(result: Result<io::Result<(usize, SocketAddr)>, Elapsed>) -> RecvEvent {
        match result {
            Err(_) => RecvEvent::Timeout,
            Ok(Ok((len, from))) => RecvEvent::Datagram { len, from },
            Ok(Err(e)) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RecvEvent::Timeout,
                io::ErrorKind::Interrupted | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused => RecvEvent::Transient(e),
                _ => RecvEvent::Fatal(e),
            },
        }
    }
}

/// Counts the frames arriving on a bound socket until the sender's end marker arrives.
pub struct ReceiveLoop {
    config: Arc<ReceiverConfig>,
}

impl ReceiveLoop {
    pub fn new(config: Arc<ReceiverConfig>) -> ReceiveLoop {
        ReceiveLoop { config }
    }

    /// Binds the configured address and runs a receive session on it. In loop mode, every
    ///  session that ends is followed by a fresh one on a freshly bound socket, until cancelled.
    ///
    /// Returns the summary of the last session.
    pub async fn run(&self, sink: &mut dyn ReportSink, cancel: &CancellationToken) -> ProbeResult<ReceiveSummary> {
        self.config.validate()?;

        loop {
            let socket = bind(self.config.bind_addr).await?;
            let bind_port = socket.local_addr()
                .map(|addr| addr.port())
                .unwrap_or(self.config.bind_addr.port());

            let summary = self.run_session(&socket, bind_port, sink, cancel).await;
            release(socket);

            if !self.config.loop_mode || summary.outcome == ReceiveOutcome::Cancelled {
                return Ok(summary);
            }

            select! {
                _ = cancel.cancelled() => {
                    info!("cancelled between sessions");
                    return Ok(summary);
                }
                _ = tokio::time::sleep(self.config.restart_delay) => {}
            }
        }
    }

    /// Runs a single receive session on a bound socket. Fatal errors end the session rather than
    ///  failing it, so that the frames counted so far are still reported.
    pub async fn run_session(&self, socket: &dyn DatagramSocket, bind_port: u16, sink: &mut dyn ReportSink, cancel: &CancellationToken) -> ReceiveSummary {
        let config = self.config.as_ref();
        info!(bind_port, recv_timeout = ?config.recv_timeout, window = config.reorder_window, "starting receive session");

        let mut aggregator = RecvWindowAggregator::new(config.reorder_window);
        let mut buf = vec![0u8; config.max_datagram_size];
        let mut peer = None;
        let mut total_sent_count = None;

        let outcome = loop {
            let result = select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("receive session cancelled");
                    break ReceiveOutcome::Cancelled;
                }
                result = timeout(config.recv_timeout, socket.recv_from(&mut buf)) => result,
            };

            let (len, from) = match RecvEvent::classify(result) {
                RecvEvent::Datagram { len, from } => (len, from),
                RecvEvent::Timeout => {
                    trace!("no data within {:?}", config.recv_timeout);
                    continue;
                }
                RecvEvent::Transient(e) => {
                    debug!("ignoring transient socket error: {}", e);
                    continue;
                }
                RecvEvent::Fatal(e) => {
                    error!("ending receive session: {}", ProbeError::NetworkFatal(e));
                    break ReceiveOutcome::NetworkFatal;
                }
            };

            let header = match decode(&buf[..len]) {
                Ok(header) => header,
                Err(e) => {
                    warn!("dropping malformed frame from {:?}: {}", from, e);
                    continue;
                }
            };
            trace!("received {} bytes from {:?}: {:?}", len, from, header);
            peer = Some(from);

            if header.is_end {
                debug!("end marker from {:?}, sender reports {} frames", from, header.total_sent_count);
                total_sent_count = Some(header.total_sent_count);
                break ReceiveOutcome::EndMarker;
            }

            aggregator.on_received(&header.bucket_key, len, sink);
        };

        let stats = aggregator.finish(sink);
        let summary = ReceiveSummary {
            outcome,
            stats,
            total_sent_count,
            loss_rate: loss_rate(stats.count, total_sent_count.unwrap_or(0)),
            peer,
            bind_port,
        };
        sink.on_receive_summary(&summary);
        summary
    }
}
