//! Legacy descriptor layouts and the per-slot ownership tag.
//!
//! # Ownership
//! ```text
//!              software clears DD, writes tail
//!   SOFTWARE ─────────────────────────────────> DEVICE
//!      ▲                                          │
//!      └──────────── device sets DD ──────────────┘
//! ```
//!
//! The DD bit is the only lock. Software touches a descriptor's address,
//! length or command fields only while it reads as [`Ownership::Software`].

use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{fence, Ordering};

use crate::platform::PhysPage;
use crate::regs::DESC_SIZE;

/// Descriptor done: the device has finished with this slot.
pub const STAT_DD: u8 = 1 << 0;
/// End of packet (RX): the buffer holds the last byte of a frame.
pub const STAT_EOP: u8 = 1 << 1;

/// TX command: end of packet ("treat as complete frame").
pub const CMD_EOP: u8 = 1 << 0;
/// TX command: report status (device sets DD when done).
pub const CMD_RS: u8 = 1 << 3;

/// Which party currently owns a ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// DD set. Software may read or rewrite the slot.
    Software,
    /// DD clear. Only the device may touch the slot.
    Device,
}

impl Ownership {
    /// Decode from a descriptor status byte.
    #[inline]
    pub fn from_status(status: u8) -> Self {
        if status & STAT_DD != 0 {
            Self::Software
        } else {
            Self::Device
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LAYOUTS
// ═══════════════════════════════════════════════════════════════════════════

/// Legacy transmit descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TxDescriptor {
    pub addr: u64,
    pub length: u16,
    pub cso: u8,
    pub cmd: u8,
    pub status: u8,
    pub css: u8,
    pub special: u16,
}

/// Legacy receive descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RxDescriptor {
    pub addr: u64,
    pub length: u16,
    pub checksum: u16,
    pub status: u8,
    pub errors: u8,
    pub special: u16,
}

const _: () = assert!(core::mem::size_of::<TxDescriptor>() == DESC_SIZE);
const _: () = assert!(core::mem::size_of::<RxDescriptor>() == DESC_SIZE);

/// Access to the status byte shared by both layouts.
pub trait Descriptor: Copy {
    /// Pointer to the status byte of the descriptor at `desc`.
    ///
    /// # Safety
    /// `desc` must point to a live descriptor.
    unsafe fn status_ptr(desc: *mut Self) -> *mut u8;
}

impl Descriptor for TxDescriptor {
    unsafe fn status_ptr(desc: *mut Self) -> *mut u8 {
        core::ptr::addr_of_mut!((*desc).status)
    }
}

impl Descriptor for RxDescriptor {
    unsafe fn status_ptr(desc: *mut Self) -> *mut u8 {
        core::ptr::addr_of_mut!((*desc).status)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TABLE
// ═══════════════════════════════════════════════════════════════════════════

/// `N` descriptors living in one DMA page shared with the device.
///
/// Every access is volatile; the device may rewrite the status byte at any
/// time.
pub struct DescriptorTable<D: Descriptor, const N: usize> {
    base: NonNull<D>,
    paddr: u64,
    _marker: PhantomData<D>,
}

impl<D: Descriptor, const N: usize> DescriptorTable<D, N> {
    /// Rejects geometries the device cannot address: the table must fit in
    /// one page and `xDLEN` must be a multiple of 128 bytes.
    const GEOMETRY_OK: () = assert!(
        N >= 8 && N % 8 == 0 && N * DESC_SIZE <= crate::platform::PAGE_SIZE,
        "ring length must be a multiple of 8 and fit in one page"
    );

    /// Place the table at the start of `page`.
    ///
    /// # Safety
    /// `page` must be exclusively owned by this table for its lifetime.
    pub unsafe fn new(page: PhysPage) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::GEOMETRY_OK;
        Self {
            base: page.vaddr().cast(),
            paddr: page.paddr() as u64,
            _marker: PhantomData,
        }
    }

    /// Number of slots.
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// Never true; rings have at least eight slots.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Bus address of slot 0 (programmed into `xDBAL/xDBAH`).
    #[inline]
    pub fn paddr(&self) -> u64 {
        self.paddr
    }

    /// Table size in bytes (programmed into `xDLEN`).
    #[inline]
    pub const fn len_bytes(&self) -> u32 {
        (N * DESC_SIZE) as u32
    }

    #[inline]
    fn slot(&self, idx: usize) -> *mut D {
        assert!(idx < N, "descriptor index {} out of range", idx);
        // SAFETY: idx < N and the table spans N descriptors.
        unsafe { self.base.as_ptr().add(idx) }
    }

    /// Snapshot a whole descriptor.
    #[inline]
    pub fn read(&self, idx: usize) -> D {
        unsafe { core::ptr::read_volatile(self.slot(idx)) }
    }

    /// Overwrite a whole descriptor.
    #[inline]
    pub fn write(&mut self, idx: usize, desc: D) {
        unsafe { core::ptr::write_volatile(self.slot(idx), desc) }
    }

    /// Current status byte.
    #[inline]
    pub fn status(&self, idx: usize) -> u8 {
        unsafe { core::ptr::read_volatile(D::status_ptr(self.slot(idx))) }
    }

    /// Replace the status byte only.
    #[inline]
    pub fn set_status(&mut self, idx: usize, status: u8) {
        unsafe { core::ptr::write_volatile(D::status_ptr(self.slot(idx)), status) }
    }

    /// Who owns slot `idx` right now.
    #[inline]
    pub fn ownership(&self, idx: usize) -> Ownership {
        let ownership = Ownership::from_status(self.status(idx));
        if ownership == Ownership::Software {
            // Nothing the device wrote before setting DD may be read early.
            fence(Ordering::Acquire);
        }
        ownership
    }
}

// Safety: the table is only reachable through its owning ring.
unsafe impl<D: Descriptor, const N: usize> Send for DescriptorTable<D, N> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PageAllocator;
    use crate::testing::test_pool;

    #[test]
    fn test_ownership_follows_dd_bit() {
        assert_eq!(Ownership::from_status(STAT_DD), Ownership::Software);
        assert_eq!(Ownership::from_status(STAT_DD | STAT_EOP), Ownership::Software);
        assert_eq!(Ownership::from_status(STAT_EOP), Ownership::Device);
        assert_eq!(Ownership::from_status(0), Ownership::Device);
    }

    #[test]
    fn test_table_layout_matches_hardware() {
        let mut pool = test_pool(1);
        let page = pool.allocate_zeroed_page().unwrap();
        let mut table: DescriptorTable<RxDescriptor, 8> = unsafe { DescriptorTable::new(page) };

        table.write(
            1,
            RxDescriptor {
                addr: 0x1122_3344_5566_7788,
                length: 0x0102,
                status: STAT_DD | STAT_EOP,
                ..Default::default()
            },
        );

        let raw = unsafe { core::slice::from_raw_parts(page.vaddr().as_ptr(), 32) };
        assert_eq!(&raw[16..24], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&raw[24..26], &[0x02, 0x01]);
        assert_eq!(raw[28], STAT_DD | STAT_EOP);
        assert_eq!(table.len_bytes(), 128);
        assert_eq!(table.paddr(), page.paddr() as u64);

        table.set_status(1, 0);
        assert_eq!(table.ownership(1), Ownership::Device);
        assert_eq!(table.read(1).length, 0x0102);
    }
}
