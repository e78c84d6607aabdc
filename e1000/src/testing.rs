//! Simulated e1000 for unit tests.
//!
//! Pages come from a leaked, page-aligned heap region, so physical and
//! virtual addresses are the same and the simulated device can follow
//! descriptor addresses directly.

use std::alloc::{alloc_zeroed, Layout};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dma_pool::{pages_to_bytes, MemoryRegion, PagePool, PAGE_SIZE};

use crate::descriptor::{RxDescriptor, TxDescriptor, STAT_DD, STAT_EOP};
use crate::mmio::RegisterWindow;
use crate::regs::{self, DESC_SIZE};

/// MAC the simulated EEPROM reports by default.
pub const SIM_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

/// Identity-mapped pool of `pages` zeroed pages.
pub fn test_pool(pages: usize) -> PagePool {
    let layout = Layout::from_size_align(pages_to_bytes(pages), PAGE_SIZE).unwrap();
    let base = unsafe { alloc_zeroed(layout) } as usize;
    assert_ne!(base, 0);
    unsafe { PagePool::from_region(MemoryRegion::new(base, pages_to_bytes(pages))) }.unwrap()
}

/// Minimal Ethernet + IPv4 + transport frame carrying `addr` at byte 30 and
/// `port` at byte 36 (both big-endian), followed by `payload`.
pub fn frame_from(addr: u32, port: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = std::vec![0u8; 38];
    frame[0..6].copy_from_slice(&SIM_MAC);
    frame[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x01]);
    frame[12..14].copy_from_slice(&[0x08, 0x00]);
    frame[14] = 0x45;
    frame[23] = 17;
    frame[30..34].copy_from_slice(&addr.to_be_bytes());
    frame[36..38].copy_from_slice(&port.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER FILE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct SimState {
    regs: HashMap<u32, u32>,
    writes: HashMap<u32, usize>,
    eeprom: [u16; 3],
    eeprom_stuck: bool,
    /// Descriptors handed over by TDT writes and not yet processed.
    ///
    /// Counted per TDT advance, not as `TDT - TDH`, so all N slots can be
    /// posted. Real hardware reads `TDT == TDH` as an empty ring; the
    /// simulator departs from it here on purpose.
    tx_pending: usize,
}

impl SimState {
    fn reg(&self, offset: u32) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    fn ring_len(&self, len_reg: u32) -> usize {
        self.reg(len_reg) as usize / DESC_SIZE
    }

    fn ring_base(&self, low: u32, high: u32) -> usize {
        ((self.reg(high) as u64) << 32 | self.reg(low) as u64) as usize
    }
}

/// Register file shared between the driver under test and a [`SimDevice`].
#[derive(Clone)]
pub struct SimRegisters {
    state: Rc<RefCell<SimState>>,
}

impl SimRegisters {
    /// Register file whose EEPROM holds [`SIM_MAC`].
    pub fn new() -> Self {
        Self::with_eeprom([
            u16::from_le_bytes([SIM_MAC[0], SIM_MAC[1]]),
            u16::from_le_bytes([SIM_MAC[2], SIM_MAC[3]]),
            u16::from_le_bytes([SIM_MAC[4], SIM_MAC[5]]),
        ])
    }

    pub fn with_eeprom(words: [u16; 3]) -> Self {
        let state = SimState {
            eeprom: words,
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Make `EERD` never report DONE.
    pub fn set_eeprom_stuck(&mut self, stuck: bool) {
        self.state.borrow_mut().eeprom_stuck = stuck;
    }

    /// Number of writes to `offset` so far.
    pub fn write_count(&self, offset: u32) -> usize {
        self.state.borrow().writes.get(&offset).copied().unwrap_or(0)
    }

    /// Number of register writes so far.
    pub fn total_writes(&self) -> usize {
        self.state.borrow().writes.values().sum()
    }

    /// Device-side handle onto the same state.
    pub fn device(&self) -> SimDevice {
        SimDevice {
            state: Rc::clone(&self.state),
        }
    }
}

impl RegisterWindow for SimRegisters {
    fn read32(&self, offset: u32) -> u32 {
        self.state.borrow().reg(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        let mut state = self.state.borrow_mut();
        *state.writes.entry(offset).or_insert(0) += 1;

        let stored = match offset {
            regs::EERD if value & regs::EERD_START != 0 => {
                let word = (value >> regs::EERD_ADDR_SHIFT) & 0xFF;
                if state.eeprom_stuck {
                    value & !regs::EERD_DONE
                } else {
                    let data = state.eeprom.get(word as usize).copied().unwrap_or(0xFFFF);
                    ((data as u32) << regs::EERD_DATA_SHIFT) | (word << regs::EERD_ADDR_SHIFT) | regs::EERD_DONE
                }
            }
            // Counts advances; never treats TDT == TDH as empty (see tx_pending).
            regs::TDT => {
                let len = state.ring_len(regs::TDLEN);
                if len > 0 {
                    let old = state.reg(regs::TDT) as usize;
                    state.tx_pending += (value as usize + len - old) % len;
                }
                value
            }
            _ => value,
        };
        state.regs.insert(offset, stored);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DEVICE
// ═══════════════════════════════════════════════════════════════════════════

/// Device side of the simulation: consumes TX descriptors and fills RX ones.
pub struct SimDevice {
    state: Rc<RefCell<SimState>>,
}

impl SimDevice {
    /// Transmit every descriptor handed over since the last call, in ring
    /// order. Returns the frames put on the wire.
    pub fn complete_tx(&self) -> Vec<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        let len = state.ring_len(regs::TDLEN);
        let base = state.ring_base(regs::TDBAL, regs::TDBAH) as *mut TxDescriptor;
        let mut wire = Vec::new();

        while state.tx_pending > 0 {
            let head = state.reg(regs::TDH) as usize;
            unsafe {
                let desc = base.add(head);
                let mut d = core::ptr::read_volatile(desc);
                let bytes = core::slice::from_raw_parts(d.addr as usize as *const u8, d.length as usize);
                wire.push(bytes.to_vec());
                d.status |= STAT_DD;
                core::ptr::write_volatile(desc, d);
            }
            state.regs.insert(regs::TDH, ((head + 1) % len) as u32);
            state.tx_pending -= 1;
        }
        wire
    }

    /// Place `frame` in the next free RX slot as a complete frame.
    ///
    /// Returns `false` if software has not returned any slot to fill.
    pub fn deliver_rx(&self, frame: &[u8]) -> bool {
        self.fill_rx(frame, STAT_DD | STAT_EOP)
    }

    /// Like [`deliver_rx`](Self::deliver_rx) but without EOP, as if the frame
    /// continued in the next descriptor.
    pub fn deliver_fragment(&self, bytes: &[u8]) -> bool {
        self.fill_rx(bytes, STAT_DD)
    }

    fn fill_rx(&self, bytes: &[u8], status: u8) -> bool {
        let mut state = self.state.borrow_mut();
        let len = state.ring_len(regs::RDLEN);
        let head = state.reg(regs::RDH) as usize;
        if len == 0 || head == state.reg(regs::RDT) as usize {
            return false;
        }
        let base = state.ring_base(regs::RDBAL, regs::RDBAH) as *mut RxDescriptor;
        unsafe {
            let desc = base.add(head);
            let mut d = core::ptr::read_volatile(desc);
            let buffer = core::slice::from_raw_parts_mut(d.addr as usize as *mut u8, regs::BUFFER_SIZE);
            buffer[..bytes.len()].copy_from_slice(bytes);
            d.length = bytes.len() as u16;
            d.status = status;
            core::ptr::write_volatile(desc, d);
        }
        state.regs.insert(regs::RDH, ((head + 1) % len) as u32);
        true
    }

    /// Descriptors handed to the device and not yet transmitted.
    pub fn tx_pending(&self) -> usize {
        self.state.borrow().tx_pending
    }
}
