//! Collaborator interfaces consumed by the driver.
//!
//! Physical memory, scheduling and environment identities all belong to
//! the surrounding kernel. The driver only sees these narrow traits.

use dma_pool::{DmaPool, PagePool};

pub use dma_pool::{PhysPage, PAGE_SIZE};

/// Identity of a user environment (process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(pub i32);

impl core::fmt::Display for EnvId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "env {:08x}", self.0)
    }
}

/// Source of zeroed, device-visible pages.
///
/// # Safety
/// Every returned page must be zeroed, page-aligned, exclusively owned by
/// the caller, valid for the rest of the program, and its `paddr` must be
/// the address the device uses to reach `vaddr`.
pub unsafe trait PageAllocator {
    /// Allocate one zeroed page, or `None` when memory is exhausted.
    fn allocate_zeroed_page(&mut self) -> Option<PhysPage>;
}

unsafe impl PageAllocator for PagePool {
    fn allocate_zeroed_page(&mut self) -> Option<PhysPage> {
        self.alloc_zeroed_page().ok()
    }
}

/// Allocates from the image-wide [`DmaPool`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalPages;

unsafe impl PageAllocator for GlobalPages {
    fn allocate_zeroed_page(&mut self) -> Option<PhysPage> {
        DmaPool::alloc_zeroed_page().ok()
    }
}

/// Cooperative scheduling hint.
pub trait Scheduler {
    /// Give up the processor so other environments (and the device) make
    /// progress. Returns when this environment is scheduled again.
    fn yield_processor(&mut self);
}

/// Spin-loop hint, for contexts with nothing else to schedule.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinYield;

impl Scheduler for SpinYield {
    fn yield_processor(&mut self) {
        core::hint::spin_loop();
    }
}
