//! Packet buffer arena.
//!
//! Slot `i` is paired with descriptor `i` for the life of the driver. Two
//! 2 KiB slots share each DMA page:
//!
//! ```text
//! page 0: [ slot 0 | slot 1 ]
//! page 1: [ slot 2 | slot 3 ]
//! ...
//! ```

use core::ptr::NonNull;

use crate::error::AttachError;
use crate::platform::{PageAllocator, PAGE_SIZE};
use crate::regs::BUFFER_SIZE;

const SLOTS_PER_PAGE: usize = PAGE_SIZE / BUFFER_SIZE;

/// One packet buffer.
#[derive(Debug, Clone, Copy)]
struct BufferSlot {
    paddr: u64,
    vaddr: NonNull<u8>,
}

impl BufferSlot {
    const UNMAPPED: Self = Self {
        paddr: 0,
        vaddr: NonNull::dangling(),
    };
}

/// Fixed arena of `N` packet buffers.
pub struct BufferArena<const N: usize> {
    slots: [BufferSlot; N],
}

impl<const N: usize> BufferArena<N> {
    /// Allocate backing pages for all `N` slots.
    ///
    /// Fails with [`AttachError::OutOfPages`] as soon as the allocator runs
    /// dry; pages obtained so far stay with the allocator's owner.
    pub fn allocate<A: PageAllocator>(pages: &mut A) -> Result<Self, AttachError> {
        let mut slots = [BufferSlot::UNMAPPED; N];
        for chunk in slots.chunks_mut(SLOTS_PER_PAGE) {
            let page = pages.allocate_zeroed_page().ok_or(AttachError::OutOfPages)?;
            for (i, slot) in chunk.iter_mut().enumerate() {
                let offset = i * BUFFER_SIZE;
                // SAFETY: offset + BUFFER_SIZE <= PAGE_SIZE.
                let vaddr = unsafe { NonNull::new_unchecked(page.vaddr().as_ptr().add(offset)) };
                *slot = BufferSlot {
                    paddr: (page.paddr() + offset) as u64,
                    vaddr,
                };
            }
        }
        Ok(Self { slots })
    }

    /// Number of pages `allocate` consumes.
    pub const fn pages_needed() -> usize {
        (N + SLOTS_PER_PAGE - 1) / SLOTS_PER_PAGE
    }

    /// Bus address of slot `idx`.
    #[inline]
    pub fn paddr(&self, idx: usize) -> u64 {
        self.slots[idx].paddr
    }

    /// Contents of slot `idx`.
    #[inline]
    pub fn slot(&self, idx: usize) -> &[u8] {
        let slot = &self.slots[idx];
        // SAFETY: each slot is BUFFER_SIZE bytes inside a page owned by the arena.
        unsafe { core::slice::from_raw_parts(slot.vaddr.as_ptr(), BUFFER_SIZE) }
    }

    /// Mutable contents of slot `idx`.
    #[inline]
    pub fn slot_mut(&mut self, idx: usize) -> &mut [u8] {
        let slot = &self.slots[idx];
        unsafe { core::slice::from_raw_parts_mut(slot.vaddr.as_ptr(), BUFFER_SIZE) }
    }
}

// Safety: slots point into pages owned exclusively by the arena.
unsafe impl<const N: usize> Send for BufferArena<N> {}
