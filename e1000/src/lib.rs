//! MorpheusX e1000 packet driver
//!
//! Polling driver for the Intel 8254x family: one TX ring, one RX ring,
//! an inbound address/port blacklist and a backpressured output service.
//!
//! # Architecture
//! ```text
//! OutputServer ──> FrameSink ──> E1000Driver ──> TxRing ──> TDT ──> wire
//!                                     │
//! caller <── FilterTable <── RxRing <─┘ <── RDH/RDT <── wire
//! ```
//!
//! Rings, buffers and the blacklist belong to one [`E1000Driver`]; there is
//! no global driver state. The only shared state in the crate is the log
//! sink.

#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod filter;
pub mod init;
pub mod logger;
pub mod mmio;
pub mod output;
#[cfg(feature = "smoltcp")]
pub mod phy;
pub mod platform;
pub mod regs;
pub mod rx;
pub mod syscall;
pub mod tx;

#[cfg(test)]
mod testing;

pub use descriptor::Ownership;
pub use driver::E1000Driver;
pub use error::{AttachError, ErrorCode, FilterError, RxError, TxError};
pub use filter::{FilterEntry, FilterTable};
pub use init::{E1000Config, MacAddress};
pub use mmio::{Mmio, RegisterWindow};
pub use output::{FrameSink, OutputConfig, OutputServer, RetryPolicy, ServeOutcome};
pub use platform::{EnvId, GlobalPages, PageAllocator, Scheduler, SpinYield};
pub use regs::MAX_FRAME_SIZE;
