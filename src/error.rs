use std::io;

use crate::frame::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// invalid startup parameters, raised before any socket is opened
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
    #[error("transmit failed: {0}")]
    Transmit(#[source] io::Error),
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),
    #[error("fatal network error: {0}")]
    NetworkFatal(#[source] io::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;
