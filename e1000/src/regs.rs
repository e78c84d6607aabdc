//! Intel 8254x (e1000) register map and bit definitions.
//!
//! Only the registers the driver programs are listed. Offsets are byte
//! offsets into BAR0.
//!
//! # Reference
//! Intel 8254x Family of Gigabit Ethernet Controllers SDM, §13

// ═══════════════════════════════════════════════════════════════════════════
// GEOMETRY
// ═══════════════════════════════════════════════════════════════════════════

/// Size of the BAR0 register window.
pub const REGISTER_WINDOW_SIZE: usize = 0x2_0000;

/// Size of one legacy descriptor (TX or RX).
pub const DESC_SIZE: usize = 16;

/// Size of each packet buffer slot. Matches `RCTL.BSIZE = 2048`.
pub const BUFFER_SIZE: usize = 2048;

/// Largest frame accepted for transmit (Ethernet frame incl. FCS class).
pub const MAX_FRAME_SIZE: usize = 1518;

/// Default number of TX descriptors.
pub const DEFAULT_TX_RING_SIZE: usize = 64;

/// Default number of RX descriptors.
pub const DEFAULT_RX_RING_SIZE: usize = 128;

/// Default blacklist capacity.
pub const DEFAULT_FILTER_CAPACITY: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════
// GENERAL
// ═══════════════════════════════════════════════════════════════════════════

/// EEPROM read register.
pub const EERD: u32 = 0x0014;
/// Interrupt cause read.
pub const ICR: u32 = 0x00C0;
/// Interrupt mask set/read.
pub const IMS: u32 = 0x00D0;

pub const EERD_START: u32 = 1 << 0;
pub const EERD_DONE: u32 = 1 << 4;
pub const EERD_ADDR_SHIFT: u32 = 8;
pub const EERD_DATA_SHIFT: u32 = 16;

/// Receiver timer interrupt.
pub const IMS_RXT0: u32 = 1 << 7;
/// Small receive packet detected.
pub const IMS_SRPD: u32 = 1 << 16;

// ═══════════════════════════════════════════════════════════════════════════
// RECEIVE
// ═══════════════════════════════════════════════════════════════════════════

pub const RCTL: u32 = 0x0100;
pub const RDBAL: u32 = 0x2800;
pub const RDBAH: u32 = 0x2804;
pub const RDLEN: u32 = 0x2808;
pub const RDH: u32 = 0x2810;
pub const RDT: u32 = 0x2818;
/// Receive small packet detect threshold.
pub const RSRPD: u32 = 0x2C00;
/// Multicast table array (first entry).
pub const MTA: u32 = 0x5200;
/// Receive address low (entry 0).
pub const RAL0: u32 = 0x5400;
/// Receive address high (entry 0).
pub const RAH0: u32 = 0x5404;

pub const RCTL_EN: u32 = 1 << 1;
/// Buffer size 2048 is encoded as BSIZE = 00 with BSEX = 0.
pub const RCTL_BSIZE_2048: u32 = 0;
/// Strip Ethernet CRC.
pub const RCTL_SECRC: u32 = 1 << 26;

/// Address valid.
pub const RAH_AV: u32 = 1 << 31;

// ═══════════════════════════════════════════════════════════════════════════
// TRANSMIT
// ═══════════════════════════════════════════════════════════════════════════

pub const TCTL: u32 = 0x0400;
pub const TIPG: u32 = 0x0410;
pub const TDBAL: u32 = 0x3800;
pub const TDBAH: u32 = 0x3804;
pub const TDLEN: u32 = 0x3808;
pub const TDH: u32 = 0x3810;
pub const TDT: u32 = 0x3818;

pub const TCTL_EN: u32 = 1 << 1;
/// Pad short packets.
pub const TCTL_PSP: u32 = 1 << 3;
pub const TCTL_CT_SHIFT: u32 = 4;
pub const TCTL_COLD_SHIFT: u32 = 12;

/// Collision threshold recommended for full duplex.
pub const TCTL_CT_DEFAULT: u32 = 0x10;
/// Collision distance recommended for full duplex.
pub const TCTL_COLD_DEFAULT: u32 = 0x40;

/// IEEE 802.3 inter-packet gap for the 82540EM.
pub const TIPG_DEFAULT: u32 = 10;
