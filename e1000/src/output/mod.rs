//! Output path: network server -> TX ring.
//!
//! A single-threaded service that takes one request at a time from the
//! network server, cuts the payload into frame-sized chunks and pushes each
//! chunk through a [`FrameSink`]. A full ring is answered by yielding the
//! processor and retrying the same chunk.
//!
//! ```text
//! RequestSource ──> validate ──> fragments ──> FrameSink::send_frame
//!                                   ▲                 │ RingFull
//!                                   └── Scheduler::yield_processor
//! ```

mod fragment;
mod request;
mod server;

pub use fragment::{fragment_count, fragments};
pub use request::{parse_packet, InboundRequest, Rejection, RequestSource, NSREQ_OUTPUT};
pub use server::{OutputConfig, OutputServer, OutputStats, RetryPolicy, ServeOutcome};

use crate::error::TxError;

/// Transmit side as seen by the output path.
pub trait FrameSink {
    /// Queue one frame of at most [`MAX_FRAME_SIZE`](crate::regs::MAX_FRAME_SIZE)
    /// bytes.
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, TxError>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, TxError> {
        (**self).send_frame(frame)
    }
}
