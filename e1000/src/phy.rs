//! smoltcp device adapter.
//!
//! Lets an [`E1000Driver`] sit under a smoltcp `Interface`. Frames are
//! staged in fixed buffers, so no allocator is needed. Blacklisted and
//! oversize frames never reach the stack.

use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use crate::driver::E1000Driver;
use crate::error::RxError;
use crate::mmio::RegisterWindow;
use crate::regs::{BUFFER_SIZE, MAX_FRAME_SIZE};

/// Largest L2 payload smoltcp may hand us (frame minus FCS).
pub const ETHERNET_MTU: usize = MAX_FRAME_SIZE - 4;

/// Adapter bridging [`E1000Driver`] to the smoltcp `Device` trait.
pub struct SmoltcpAdapter<'a, W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> {
    driver: &'a mut E1000Driver<W, TX, RX, F>,
}

impl<'a, W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> SmoltcpAdapter<'a, W, TX, RX, F> {
    pub fn new(driver: &'a mut E1000Driver<W, TX, RX, F>) -> Self {
        Self { driver }
    }
}

/// Received frame, copied out of the ring.
pub struct RxToken {
    buffer: [u8; BUFFER_SIZE],
    len: usize,
}

impl phy::RxToken for RxToken {
    fn consume<R, G>(mut self, f: G) -> R
    where
        G: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.buffer[..self.len])
    }
}

/// Permission to queue one frame.
pub struct TxToken<'a, W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> {
    driver: &'a mut E1000Driver<W, TX, RX, F>,
}

impl<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> phy::TxToken
    for TxToken<'_, W, TX, RX, F>
{
    fn consume<R, G>(self, len: usize, f: G) -> R
    where
        G: FnOnce(&mut [u8]) -> R,
    {
        let mut frame = [0u8; MAX_FRAME_SIZE];
        let len = len.min(MAX_FRAME_SIZE);
        let result = f(&mut frame[..len]);
        if let Err(err) = self.driver.send_packet(&frame[..len]) {
            log::warn!(target: "e1000", "smoltcp frame of {} bytes dropped: {}", len, err);
        }
        result
    }
}

impl<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> phy::Device
    for SmoltcpAdapter<'_, W, TX, RX, F>
{
    type RxToken<'b> = RxToken where Self: 'b;
    type TxToken<'b> = TxToken<'b, W, TX, RX, F> where Self: 'b;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let mut rx = RxToken {
            buffer: [0u8; BUFFER_SIZE],
            len: 0,
        };
        loop {
            match self.driver.receive_packet(&mut rx.buffer) {
                Ok(len) => {
                    rx.len = len;
                    return Some((rx, TxToken { driver: &mut *self.driver }));
                }
                // Dropped frames already released their slot; look further.
                Err(RxError::Blacklisted) | Err(RxError::OversizeFrame) => continue,
                Err(_) => return None,
            }
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.driver.can_transmit() {
            Some(TxToken { driver: &mut *self.driver })
        } else {
            None
        }
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = ETHERNET_MTU;
        caps.max_burst_size = Some(1);
        caps
    }
}
