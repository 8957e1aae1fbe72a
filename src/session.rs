use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::buckets::SessionStats;
use crate::frame::{encode, ControlHeader};
use crate::socket::DatagramSocket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// all frames were sent and the end marker was signalled
    Completed,
    /// a transmit failed; no end marker was sent
    TransmitFailed,
    /// cancelled from the outside; no end marker was sent
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    EndMarker,
    NetworkFatal,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendSummary {
    pub outcome: SendOutcome,
    pub stats: SessionStats,
}

impl SendSummary {
    pub fn is_success(&self) -> bool {
        self.outcome == SendOutcome::Completed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveSummary {
    pub outcome: ReceiveOutcome,
    pub stats: SessionStats,
    /// the sender's count from the end marker, `None` if no end marker arrived
    pub total_sent_count: Option<u64>,
    /// received frames per sent frame
    pub loss_rate: f64,
    /// source address of the last accepted frame
    pub peer: Option<SocketAddr>,
    pub bind_port: u16,
}

/// Returns `received / total_sent`, or 0 if nothing was reported as sent - which is also what a
///  lost end marker looks like.
pub fn loss_rate(received: u64, total_sent: u64) -> f64 {
    if total_sent == 0 {
        return 0.0;
    }
    received as f64 / total_sent as f64
}

/// Sends the end marker `repeats` times, `interval` apart. Each send is best effort: a failed or
///  short send is logged and the remaining repeats still go out. Returns the number of complete
///  sends.
pub async fn send_end_markers(
    socket: &dyn DatagramSocket,
    to: SocketAddr,
    header: &ControlHeader,
    mtu: usize,
    repeats: u32,
    interval: Duration,
) -> u32 {
    let frame = match encode(header, mtu) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("cannot encode end marker - not sending it: {}", e);
            return 0;
        }
    };

    let mut num_complete = 0;
    for i in 0..repeats {
        match socket.send_to(&frame, to).await {
            Ok(n) if n == frame.len() => {
                num_complete += 1;
            }
            Ok(n) => {
                warn!("end marker #{} was cut short: sent {} of {} bytes", i, n, frame.len());
            }
            Err(e) => {
                warn!("failed to send end marker #{}: {}", i, e);
            }
        }
        tokio::time::sleep(interval).await;
    }

    debug!("sent {} of {} end markers, total sent count {}", num_complete, repeats, header.total_sent_count);
    num_complete
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::frame::decode;
    use crate::socket::MockDatagramSocket;
    use rstest::rstest;

    #[rstest]
    #[case::nothing_sent(0, 0, 0.0)]
    #[case::end_marker_lost(17, 0, 0.0)]
    #[case::all_received(100, 100, 1.0)]
    #[case::some_lost(75, 100, 0.75)]
    fn test_loss_rate(#[case] received: u64, #[case] total_sent: u64, #[case] expected: f64) {
        assert_eq!(loss_rate(received, total_sent), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_end_markers_repeats_with_interval() {
        let to = SocketAddr::from(([127, 0, 0, 1], 13001));
        let start = tokio::time::Instant::now();

        let mut socket = MockDatagramSocket::new();
        socket.expect_send_to()
            .times(3)
            .returning(move |buf, addr| {
                assert_eq!(addr, to);
                let header = decode(buf).unwrap();
                assert!(header.is_end);
                assert_eq!(header.total_sent_count, 1234);
                Ok(buf.len())
            });

        let header = ControlHeader::end_marker("20240101000000", 1234);
        let num_sent = send_end_markers(&socket, to, &header, 200, 3, Duration::from_millis(300)).await;

        assert_eq!(num_sent, 3);
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_end_markers_continues_after_failure() {
        let to = SocketAddr::from(([127, 0, 0, 1], 13001));
        let calls = Arc::new(AtomicU32::new(0));

        let mut socket = MockDatagramSocket::new();
        let calls_in_mock = calls.clone();
        socket.expect_send_to()
            .returning(move |buf, _| {
                match calls_in_mock.fetch_add(1, Ordering::AcqRel) {
                    0 => Err(io::Error::new(io::ErrorKind::Other, "boom")),
                    1 => Ok(buf.len() - 1),
                    _ => Ok(buf.len()),
                }
            });

        let header = ControlHeader::end_marker("20240101000000", 5);
        let num_sent = send_end_markers(&socket, to, &header, 200, 3, Duration::from_millis(300)).await;

        assert_eq!(num_sent, 1);
        assert_eq!(calls.load(Ordering::Acquire), 3);
    }
}
