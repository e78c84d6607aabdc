//! e1000 RX path.
//!
//! `RDT` points at the last slot software handed back to the device. The
//! device fills slots from `RDH` up to (not including) `RDT`, so the next
//! frame to look at is always the one right after the tail.

use core::sync::atomic::{fence, Ordering};

use crate::buffer::BufferArena;
use crate::descriptor::{DescriptorTable, Ownership, RxDescriptor, STAT_DD, STAT_EOP};
use crate::error::{AttachError, RxError};
use crate::filter::{inspected_fields, FilterTable};
use crate::mmio::RegisterWindow;
use crate::platform::PageAllocator;
use crate::regs;

// ═══════════════════════════════════════════════════════════════════════════
// RX RING
// ═══════════════════════════════════════════════════════════════════════════

/// RX descriptor ring.
pub struct RxRing<const N: usize> {
    descriptors: DescriptorTable<RxDescriptor, N>,
    buffers: BufferArena<N>,
    /// Last slot returned to the device. Mirrors `RDT`.
    tail: usize,
}

impl<const N: usize> RxRing<N> {
    /// Allocate the descriptor page and buffers.
    pub fn allocate<A: PageAllocator>(pages: &mut A) -> Result<Self, AttachError> {
        let page = pages.allocate_zeroed_page().ok_or(AttachError::OutOfPages)?;
        // SAFETY: the page was just handed to us.
        let descriptors = unsafe { DescriptorTable::new(page) };
        let buffers = BufferArena::allocate(pages)?;
        Ok(Self {
            descriptors,
            buffers,
            tail: N - 1,
        })
    }

    /// Point every descriptor at its buffer and give all slots to the device.
    pub fn init_descriptors(&mut self) {
        for i in 0..N {
            self.descriptors.write(
                i,
                RxDescriptor {
                    addr: self.buffers.paddr(i),
                    ..Default::default()
                },
            );
        }
        self.tail = N - 1;
    }

    /// Program base/length/head/tail registers.
    pub fn program<W: RegisterWindow>(&self, regs: &mut W) {
        let base = self.descriptors.paddr();
        regs.write32(regs::RDBAL, base as u32);
        regs.write32(regs::RDBAH, (base >> 32) as u32);
        regs.write32(regs::RDLEN, self.descriptors.len_bytes());
        regs.write32(regs::RDH, 0);
        regs.write32(regs::RDT, self.tail as u32);
    }

    /// Slot the device is expected to fill next.
    #[inline]
    fn candidate(&self) -> usize {
        (self.tail + 1) % N
    }

    /// Check if a frame is waiting.
    #[inline]
    pub fn can_receive(&self) -> bool {
        self.descriptors.ownership(self.candidate()) == Ownership::Software
    }

    /// Receive one frame into `out`.
    ///
    /// # Returns
    /// - `Ok(len)`: bytes copied, `min(frame length, out.len())`
    /// - `Err(RxError::RingEmpty)`: nothing ready
    /// - `Err(RxError::OversizeFrame)`: frame spans descriptors; dropped
    /// - `Err(RxError::Blacklisted)`: frame matched `filters`; dropped
    ///
    /// Dropped frames still give their slot back to the device.
    pub fn receive<W: RegisterWindow, const F: usize>(
        &mut self,
        regs: &mut W,
        filters: &FilterTable<F>,
        out: &mut [u8],
    ) -> Result<usize, RxError> {
        let idx = self.candidate();

        // ownership() issues the acquire fence once DD is seen.
        if self.descriptors.ownership(idx) == Ownership::Device {
            return Err(RxError::RingEmpty);
        }

        let desc = self.descriptors.read(idx);
        if desc.status & STAT_EOP == 0 {
            log::warn!(target: "e1000", "rx slot {}: frame spans descriptors, dropped", idx);
            self.release_descriptor(regs, idx);
            return Err(RxError::OversizeFrame);
        }

        let length = (desc.length as usize).min(regs::BUFFER_SIZE);
        let frame = &self.buffers.slot(idx)[..length];

        if filters.is_blacklisted(frame) {
            if let (Some(addr), port) = inspected_fields(frame) {
                log::debug!(
                    target: "e1000",
                    "rx slot {}: blacklisted {}.{}.{}.{}:{}",
                    idx,
                    addr >> 24,
                    (addr >> 16) & 0xFF,
                    (addr >> 8) & 0xFF,
                    addr & 0xFF,
                    port.unwrap_or(0)
                );
            }
            self.release_descriptor(regs, idx);
            return Err(RxError::Blacklisted);
        }

        // Undersized caller buffers truncate silently.
        let copied = length.min(out.len());
        out[..copied].copy_from_slice(&frame[..copied]);

        self.release_descriptor(regs, idx);

        log::trace!(target: "e1000", "rx slot {} delivered {} bytes", idx, copied);
        Ok(copied)
    }

    /// Give slot `idx` back to the device and make it the new tail.
    fn release_descriptor<W: RegisterWindow>(&mut self, regs: &mut W, idx: usize) {
        let status = self.descriptors.status(idx);
        self.descriptors.set_status(idx, status & !(STAT_DD | STAT_EOP));
        self.tail = idx;

        fence(Ordering::Release);
        regs.write32(regs::RDT, idx as u32);
    }

    /// Last slot returned to the device.
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Ownership of slot `idx`.
    #[inline]
    pub fn ownership(&self, idx: usize) -> Ownership {
        self.descriptors.ownership(idx)
    }

    /// Snapshot of descriptor `idx`.
    #[inline]
    pub fn descriptor(&self, idx: usize) -> RxDescriptor {
        self.descriptors.read(idx)
    }

    /// Number of slots.
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}
