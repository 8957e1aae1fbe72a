//! A point-to-point UDP throughput probe: a sender floods fixed-size frames at a bounded bitrate
//!  for a fixed duration, a receiver counts what arrives and reports the ratio of received to
//!  sent frames once the sender signals the end of the session.
//!
//! ## Rate limiting
//!
//! The sender keeps a bit budget per second of the session (seconds counted from the session
//!  start). A frame is admitted only if `max_bits - frame_bits > bits_sent_this_second`, otherwise
//!  it is re-evaluated after a short delay. So no second ever carries more than the configured
//!  bitrate.
//!
//! Before sending the first frame, the sender waits for the wall clock to pass a second
//!  boundary, so that its per-second buckets line up with the receiver's.
//!
//! ## Buckets
//!
//! Every frame carries the wall clock second it was created in (`YYYYMMDDHHMMSS`), and both
//!  sides aggregate frames by that key:
//! * the sender flushes a bucket as soon as it sends a frame with a different key
//! * the receiver keeps a window of (by default) two buckets open to tolerate reordering, and
//!   flushes the oldest one when a frame for a third key arrives
//!
//! ## Frame
//!
//! A frame is a single UDP payload, padded to exactly the configured MTU:
//! ```ascii
//!  0: header length L as four zero-padded ASCII decimal digits, e.g. "0080"
//!  4: header (JSON): {"DatetimeKey":"YYYYMMDDHHMMSS","IsFirst":bool,"IsEnd":bool,"TotalSentCount":uint}
//!  4+L: filler up to the MTU
//! ```
//!
//! ## Session end
//!
//! After its duration has elapsed, the sender sends an end marker frame (`IsEnd`) carrying the
//!  number of frames it sent, three times and 300ms apart since UDP may drop any of them. The
//!  receiver stops at the first end marker it sees. If the sender fails to transmit, or is
//!  cancelled, it sends no end marker at all.

pub mod buckets;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod report;
pub mod sender;
pub mod session;
pub mod socket;
