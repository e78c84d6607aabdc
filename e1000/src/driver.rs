//! e1000 driver facade.
//!
//! Owns everything the device needs for its lifetime: the register window,
//! both rings, the blacklist and the per-driver flags. Every mutating call
//! takes `&mut self`, so one software context drives each ring.

use crate::error::{AttachError, FilterError, RxError, TxError};
use crate::filter::FilterTable;
use crate::init::{init_e1000, E1000Config, MacAddress};
use crate::mmio::RegisterWindow;
use crate::output::FrameSink;
use crate::platform::{EnvId, PageAllocator};
use crate::regs::{DEFAULT_FILTER_CAPACITY, DEFAULT_RX_RING_SIZE, DEFAULT_TX_RING_SIZE};
use crate::rx::RxRing;
use crate::tx::TxRing;

// ═══════════════════════════════════════════════════════════════════════════
// DRIVER
// ═══════════════════════════════════════════════════════════════════════════

/// Polling e1000 driver.
///
/// `TX`/`RX` are ring lengths, `F` is the blacklist capacity.
pub struct E1000Driver<
    W: RegisterWindow,
    const TX: usize = { DEFAULT_TX_RING_SIZE },
    const RX: usize = { DEFAULT_RX_RING_SIZE },
    const F: usize = { DEFAULT_FILTER_CAPACITY },
> {
    regs: W,
    mac: MacAddress,
    tx_ring: TxRing<TX>,
    rx_ring: RxRing<RX>,
    filters: FilterTable<F>,
    non_blocking: bool,
    input_target: Option<EnvId>,
}

impl<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> E1000Driver<W, TX, RX, F> {
    /// Attach to the device behind `regs`.
    ///
    /// Rings are backed by pages from `pages`. On error nothing is returned,
    /// so no half-initialised ring is ever reachable.
    pub fn attach<A: PageAllocator>(
        mut regs: W,
        pages: &mut A,
        config: &E1000Config,
    ) -> Result<Self, AttachError> {
        let result = init_e1000::<W, A, TX, RX>(&mut regs, pages, config).map_err(|err| {
            log::error!(target: "e1000", "attach failed: {}", err);
            err
        })?;

        Ok(Self {
            regs,
            mac: result.mac,
            tx_ring: result.tx_ring,
            rx_ring: result.rx_ring,
            filters: FilterTable::new(),
            non_blocking: false,
            input_target: None,
        })
    }

    // ───────────────────────────────────────────────────────────────────────
    // Datapath
    // ───────────────────────────────────────────────────────────────────────

    /// Queue one frame for transmission. See [`TxRing::send`].
    #[inline]
    pub fn send_packet(&mut self, frame: &[u8]) -> Result<usize, TxError> {
        self.tx_ring.send(&mut self.regs, frame)
    }

    /// Poll for one inbound frame. See [`RxRing::receive`].
    #[inline]
    pub fn receive_packet(&mut self, out: &mut [u8]) -> Result<usize, RxError> {
        self.rx_ring.receive(&mut self.regs, &self.filters, out)
    }

    #[inline]
    pub fn can_transmit(&self) -> bool {
        self.tx_ring.can_transmit()
    }

    #[inline]
    pub fn can_receive(&self) -> bool {
        self.rx_ring.can_receive()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Blacklist
    // ───────────────────────────────────────────────────────────────────────

    /// Block inbound traffic from `address` (host order) or to/from `port`.
    /// A zero field blocks nothing.
    pub fn add_filter(&mut self, address: u32, port: u16) -> Result<(), FilterError> {
        self.filters.add(address, port).map_err(|err| {
            log::warn!(target: "e1000", "filter ({:#010x}, {}) rejected: {}", address, port, err);
            err
        })?;
        log::debug!(target: "e1000", "filter added ({:#010x}, {})", address, port);
        Ok(())
    }

    pub fn filters(&self) -> &FilterTable<F> {
        &self.filters
    }

    // ───────────────────────────────────────────────────────────────────────
    // Flags consumed by the input side
    // ───────────────────────────────────────────────────────────────────────

    pub fn enable_non_blocking_mode(&mut self) {
        self.non_blocking = true;
    }

    /// Clear the flag, returning its previous value.
    pub fn disable_non_blocking_mode(&mut self) -> bool {
        core::mem::replace(&mut self.non_blocking, false)
    }

    pub fn is_non_blocking(&self) -> bool {
        self.non_blocking
    }

    /// Record which environment should be told about inbound traffic.
    pub fn set_input_target(&mut self, env: EnvId) {
        self.input_target = Some(env);
    }

    pub fn input_target(&self) -> Option<EnvId> {
        self.input_target
    }

    // ───────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────

    /// Burned-in MAC address read at attach.
    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    pub fn registers(&self) -> &W {
        &self.regs
    }

    pub fn tx_ring(&self) -> &TxRing<TX> {
        &self.tx_ring
    }

    pub fn rx_ring(&self) -> &RxRing<RX> {
        &self.rx_ring
    }
}

impl<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize> FrameSink
    for E1000Driver<W, TX, RX, F>
{
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, TxError> {
        self.send_packet(frame)
    }
}
