use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};
use crate::frame::{encoded_header_len, ControlHeader};

pub const DEFAULT_PORT: u16 = 13001;
pub const DEFAULT_MTU: usize = 1500;
/// maximum UDP payload over IPv4
pub const MAX_MTU: usize = 65507;

macro_rules! config_error {
    ($($arg:tt)*) => {
        return Err(ProbeError::Config(format!($($arg)*)))
    };
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub destination: SocketAddr,

    /// ceiling for the bitrate of data frames, in Mbit/s (10^6 bits)
    pub max_bitrate_mbps: f64,
    pub duration: Duration,

    /// every frame is padded to exactly this many bytes
    pub mtu: usize,

    /// delay before re-evaluating a frame that did not fit into the current second's budget
    pub admission_retry_delay: Duration,

    /// If set, the session starts only once the wall clock's sub-second part is below this
    ///  threshold, aligning buckets with second ticks.
    pub alignment_threshold: Option<Duration>,
    pub alignment_poll_interval: Duration,

    /// UDP may drop the end marker, so it is sent repeatedly
    pub end_marker_repeats: u32,
    pub end_marker_interval: Duration,
}

impl SenderConfig {
    pub fn new(destination: SocketAddr) -> SenderConfig {
        SenderConfig {
            destination,
            max_bitrate_mbps: 3.0,
            duration: Duration::from_secs(5),
            mtu: DEFAULT_MTU,
            admission_retry_delay: Duration::from_millis(4),
            alignment_threshold: Some(Duration::from_millis(50)),
            alignment_poll_interval: Duration::from_millis(5),
            end_marker_repeats: 3,
            end_marker_interval: Duration::from_millis(300),
        }
    }

    pub fn max_bits_per_second(&self) -> f64 {
        self.max_bitrate_mbps * 1_000_000.0
    }

    /// the smallest MTU that still carries an end marker with the largest possible count
    pub fn min_mtu() -> usize {
        encoded_header_len(&ControlHeader::end_marker("00000000000000", u64::MAX))
            .unwrap_or(MAX_MTU)
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if !self.max_bitrate_mbps.is_finite() || self.max_bitrate_mbps <= 0.0 {
            config_error!("maximum bitrate must be a positive number of Mbit/s, was {}", self.max_bitrate_mbps);
        }
        if self.duration.is_zero() {
            config_error!("duration must not be zero");
        }
        if self.mtu < Self::min_mtu() {
            config_error!("MTU of {} bytes is too small to hold a frame header, the minimum is {}", self.mtu, Self::min_mtu());
        }
        if self.mtu > MAX_MTU {
            config_error!("MTU of {} bytes exceeds the maximum UDP payload of {}", self.mtu, MAX_MTU);
        }
        if self.end_marker_repeats == 0 {
            config_error!("the end marker must be sent at least once");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub bind_addr: SocketAddr,

    /// start a fresh session after each one ends, until cancelled
    pub loop_mode: bool,
    pub restart_delay: Duration,

    /// Bounds each receive call. Running into the timeout is routine, it only gives the loop a
    ///  chance to check for cancellation.
    pub recv_timeout: Duration,

    /// number of buckets that are kept open concurrently to tolerate reordering
    pub reorder_window: usize,

    /// datagrams longer than this are truncated
    pub max_datagram_size: usize,
}

impl ReceiverConfig {
    pub fn new(port: u16) -> ReceiverConfig {
        ReceiverConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            loop_mode: false,
            restart_delay: Duration::from_secs(1),
            recv_timeout: Duration::from_secs(2),
            reorder_window: 2,
            max_datagram_size: DEFAULT_MTU,
        }
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if self.recv_timeout.is_zero() {
            config_error!("receive timeout must not be zero");
        }
        if self.reorder_window == 0 {
            config_error!("reorder window must hold at least one bucket");
        }
        if self.max_datagram_size == 0 || self.max_datagram_size > MAX_MTU {
            config_error!("maximum datagram size must be between 1 and {}, was {}", MAX_MTU, self.max_datagram_size);
        }
        Ok(())
    }
}
