//! e1000 TX path.
//!
//! Fire-and-forget: a frame is copied into the slot at the software tail,
//! the slot is handed to the device, and the tail register is bumped. The
//! device sets DD when it is done, which is the only way a slot comes back.
//! There is no free list and no completion collection.

use core::sync::atomic::{fence, Ordering};

use crate::buffer::BufferArena;
use crate::descriptor::{DescriptorTable, Ownership, TxDescriptor, CMD_EOP, CMD_RS, STAT_DD};
use crate::error::{AttachError, TxError};
use crate::mmio::RegisterWindow;
use crate::platform::PageAllocator;
use crate::regs::{self, MAX_FRAME_SIZE};

/// TX descriptor ring.
pub struct TxRing<const N: usize> {
    descriptors: DescriptorTable<TxDescriptor, N>,
    buffers: BufferArena<N>,
    /// Next slot to hand to the device. Mirrors `TDT`.
    tail: usize,
}

impl<const N: usize> TxRing<N> {
    /// Allocate the descriptor page and buffers.
    pub fn allocate<A: PageAllocator>(pages: &mut A) -> Result<Self, AttachError> {
        let page = pages.allocate_zeroed_page().ok_or(AttachError::OutOfPages)?;
        // SAFETY: the page was just handed to us.
        let descriptors = unsafe { DescriptorTable::new(page) };
        let buffers = BufferArena::allocate(pages)?;
        Ok(Self {
            descriptors,
            buffers,
            tail: 0,
        })
    }

    /// Point every descriptor at its buffer and mark it software-owned.
    pub fn init_descriptors(&mut self) {
        for i in 0..N {
            self.descriptors.write(
                i,
                TxDescriptor {
                    addr: self.buffers.paddr(i),
                    cmd: CMD_RS | CMD_EOP,
                    status: STAT_DD,
                    ..Default::default()
                },
            );
        }
        self.tail = 0;
    }

    /// Program base/length/head/tail registers.
    pub fn program<W: RegisterWindow>(&self, regs: &mut W) {
        let base = self.descriptors.paddr();
        regs.write32(regs::TDBAL, base as u32);
        regs.write32(regs::TDBAH, (base >> 32) as u32);
        regs.write32(regs::TDLEN, self.descriptors.len_bytes());
        regs.write32(regs::TDH, 0);
        regs.write32(regs::TDT, self.tail as u32);
    }

    /// Queue one frame.
    ///
    /// # Returns
    /// - `Ok(len)`: frame handed to the device
    /// - `Err(TxError::RingFull)`: slot at the tail is still device-owned;
    ///   nothing was touched, retry later
    /// - `Err(TxError::PacketTooLarge)`: frame longer than [`MAX_FRAME_SIZE`]
    pub fn send<W: RegisterWindow>(&mut self, regs: &mut W, frame: &[u8]) -> Result<usize, TxError> {
        if frame.len() > MAX_FRAME_SIZE {
            return Err(TxError::PacketTooLarge {
                len: frame.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let idx = self.tail;
        if self.descriptors.ownership(idx) == Ownership::Device {
            log::trace!(target: "e1000", "tx ring full at slot {}", idx);
            return Err(TxError::RingFull);
        }

        // Slot is ours until DD is cleared below.
        self.buffers.slot_mut(idx)[..frame.len()].copy_from_slice(frame);
        let mut desc = self.descriptors.read(idx);
        desc.length = frame.len() as u16;
        desc.status &= !STAT_DD;
        self.descriptors.write(idx, desc);

        self.tail = (idx + 1) % N;

        // Descriptor and buffer must be visible before the device sees the tail.
        fence(Ordering::Release);
        regs.write32(regs::TDT, self.tail as u32);

        log::trace!(target: "e1000", "tx slot {} queued {} bytes", idx, frame.len());
        Ok(frame.len())
    }

    /// True if the next `send` will not report `RingFull`.
    #[inline]
    pub fn can_transmit(&self) -> bool {
        self.descriptors.ownership(self.tail) == Ownership::Software
    }

    /// Software tail (next slot to fill).
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
    pub fn descriptor(&self, idx: usize) -> TxDescriptor {
        self.descriptors.read(idx)
    }

    /// Contents of buffer slot `idx`.
    #[inline]
    pub fn buffer(&self, idx: usize) -> &[u8] {
        self.buffers.slot(idx)
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
