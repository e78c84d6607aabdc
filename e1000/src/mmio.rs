//! Device register window.
//!
//! # Safety
//! - Address must be valid MMIO address
//! - Address must be properly aligned
//! - Address must be mapped uncached
//!
//! The bus layer discovers BAR0 and maps it; this module only wraps the
//! mapping in word-indexed accessors.

use core::ptr::NonNull;

/// Word-indexed access to a device register window.
///
/// Offsets are byte offsets and must be 4-byte aligned.
pub trait RegisterWindow {
    /// Read a 32-bit register.
    fn read32(&self, offset: u32) -> u32;

    /// Write a 32-bit register.
    fn write32(&mut self, offset: u32, value: u32);

    /// Read-modify-write: OR `bits` into a register.
    fn set_bits(&mut self, offset: u32, bits: u32) {
        let value = self.read32(offset);
        self.write32(offset, value | bits);
    }
}

/// Volatile MMIO window over a mapped BAR.
pub struct Mmio {
    base: NonNull<u32>,
    size: usize,
}

impl Mmio {
    /// Wrap a register region mapped by the bus layer.
    ///
    /// `size` is the mapped length, normally
    /// [`REGISTER_WINDOW_SIZE`](crate::regs::REGISTER_WINDOW_SIZE) for BAR0.
    ///
    /// # Safety
    /// - `base` must point at `size` bytes of mapped device registers
    /// - the mapping must outlive the returned window
    /// - no other context may drive the same registers
    pub unsafe fn map_device_registers(base: NonNull<u8>, size: usize) -> Self {
        Self {
            base: base.cast(),
            size,
        }
    }

    /// Size of the window in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn word(&self, offset: u32) -> *mut u32 {
        let offset = offset as usize;
        debug_assert!(offset % 4 == 0 && offset + 4 <= self.size, "register {offset:#x} out of window");
        // SAFETY: offset is inside the mapped window.
        unsafe { self.base.as_ptr().add(offset >> 2) }
    }
}

impl RegisterWindow for Mmio {
    #[inline]
    fn read32(&self, offset: u32) -> u32 {
        unsafe { core::ptr::read_volatile(self.word(offset)) }
    }

    #[inline]
    fn write32(&mut self, offset: u32, value: u32) {
        unsafe { core::ptr::write_volatile(self.word(offset), value) }
    }
}

// Safety: the window is only reachable through `&mut self`; the driver that
// owns it is the single software context driving the device.
unsafe impl Send for Mmio {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_indexing() {
        let mut backing = [0u32; 8];
        let base = NonNull::new(backing.as_mut_ptr() as *mut u8).unwrap();
        let mut window = unsafe { Mmio::map_device_registers(base, backing.len() * 4) };

        window.write32(0x08, 0xDEAD_BEEF);
        window.set_bits(0x0C, 0x3);
        window.set_bits(0x0C, 0x4);

        assert_eq!(window.read32(0x08), 0xDEAD_BEEF);
        assert_eq!(window.read32(0x0C), 0x7);
        assert_eq!(window.size(), 32);
        drop(window);
        assert_eq!(backing[2], 0xDEAD_BEEF);
    }

    #[test]
    fn test_full_bar_reaches_ring_registers() {
        use crate::regs::{REGISTER_WINDOW_SIZE, RDT, TDT};

        let mut backing = std::vec![0u32; REGISTER_WINDOW_SIZE / 4];
        let base = NonNull::new(backing.as_mut_ptr() as *mut u8).unwrap();
        let mut window = unsafe { Mmio::map_device_registers(base, REGISTER_WINDOW_SIZE) };

        window.write32(TDT, 5);
        window.write32(RDT, 127);
        assert_eq!(window.read32(TDT), 5);
        assert_eq!(window.size(), REGISTER_WINDOW_SIZE);
        drop(window);
        assert_eq!(backing[TDT as usize / 4], 5);
        assert_eq!(backing[RDT as usize / 4], 127);
    }
}
