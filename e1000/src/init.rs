//! e1000 attach sequence.
//!
//! # Initialization Sequence
//! 1. Allocate both rings (nothing touches the device if this fails)
//! 2. Flush pending interrupt causes, unmask RXT0 and SRPD
//! 3. Program and enable the TX ring
//! 4. Read the MAC from the EEPROM
//! 5. Program the receive address filter
//! 6. Program and enable the RX ring
//!
//! # Reference
//! Intel 8254x Family SDM, §14 (General Initialization)

use crate::error::AttachError;
use crate::mmio::RegisterWindow;
use crate::platform::PageAllocator;
use crate::regs;
use crate::rx::RxRing;
use crate::tx::TxRing;

/// Hardware address.
pub type MacAddress = [u8; 6];

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// e1000 attach configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E1000Config {
    /// How many times `EERD` is polled for DONE before giving up.
    pub eeprom_poll_limit: u32,
    /// Value programmed into `RSRPD`.
    pub small_packet_threshold: u32,
    /// Value programmed into `TIPG`.
    pub tipg: u32,
}

impl E1000Config {
    /// Default EEPROM poll budget.
    pub const DEFAULT_EEPROM_POLL_LIMIT: u32 = 100_000;
}

impl Default for E1000Config {
    fn default() -> Self {
        Self {
            eeprom_poll_limit: Self::DEFAULT_EEPROM_POLL_LIMIT,
            small_packet_threshold: regs::MAX_FRAME_SIZE as u32,
            tipg: regs::TIPG_DEFAULT,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// INITIALIZATION RESULT
// ═══════════════════════════════════════════════════════════════════════════

/// Result of successful initialization.
pub struct E1000InitResult<const TX: usize, const RX: usize> {
    /// MAC address.
    pub mac: MacAddress,
    /// TX ring.
    pub tx_ring: TxRing<TX>,
    /// RX ring.
    pub rx_ring: RxRing<RX>,
}

// ═══════════════════════════════════════════════════════════════════════════
// INITIALIZATION
// ═══════════════════════════════════════════════════════════════════════════

/// Bring up the device behind `regs`.
///
/// Not idempotent: every call allocates fresh rings and reprograms the
/// device from scratch.
///
/// # Errors
/// - [`AttachError::OutOfPages`]: `pages` ran dry; the device is untouched
/// - [`AttachError::EepromTimeout`]: `EERD` never reported DONE
pub fn init_e1000<W, A, const TX: usize, const RX: usize>(
    regs: &mut W,
    pages: &mut A,
    config: &E1000Config,
) -> Result<E1000InitResult<TX, RX>, AttachError>
where
    W: RegisterWindow,
    A: PageAllocator,
{
    // ═══════════════════════════════════════════════════════════════════
    // STEP 1: ALLOCATE RINGS
    // ═══════════════════════════════════════════════════════════════════
    let mut tx_ring = TxRing::<TX>::allocate(pages)?;
    let mut rx_ring = RxRing::<RX>::allocate(pages)?;

    // ═══════════════════════════════════════════════════════════════════
    // STEP 2: INTERRUPTS
    // ═══════════════════════════════════════════════════════════════════
    let _ = regs.read32(regs::ICR);
    regs.set_bits(regs::IMS, regs::IMS_RXT0 | regs::IMS_SRPD);
    regs.write32(regs::RSRPD, config.small_packet_threshold);

    // ═══════════════════════════════════════════════════════════════════
    // STEP 3: TX RING
    // ═══════════════════════════════════════════════════════════════════
    tx_ring.init_descriptors();
    tx_ring.program(regs);
    regs.write32(
        regs::TCTL,
        regs::TCTL_PSP
            | (regs::TCTL_CT_DEFAULT << regs::TCTL_CT_SHIFT)
            | (regs::TCTL_COLD_DEFAULT << regs::TCTL_COLD_SHIFT),
    );
    regs.write32(regs::TIPG, config.tipg);
    regs.set_bits(regs::TCTL, regs::TCTL_EN);

    // ═══════════════════════════════════════════════════════════════════
    // STEP 4: MAC ADDRESS
    // ═══════════════════════════════════════════════════════════════════
    let mac = read_mac(regs, config.eeprom_poll_limit)?;

    // ═══════════════════════════════════════════════════════════════════
    // STEP 5: RECEIVE ADDRESS + MULTICAST
    // ═══════════════════════════════════════════════════════════════════
    regs.write32(regs::RAL0, u32::from_le_bytes([mac[0], mac[1], mac[2], mac[3]]));
    regs.write32(regs::RAH0, u16::from_le_bytes([mac[4], mac[5]]) as u32 | regs::RAH_AV);
    regs.write32(regs::MTA, 0);

    // ═══════════════════════════════════════════════════════════════════
    // STEP 6: RX RING
    // ═══════════════════════════════════════════════════════════════════
    rx_ring.init_descriptors();
    rx_ring.program(regs);
    regs.write32(regs::RCTL, regs::RCTL_SECRC | regs::RCTL_BSIZE_2048);
    regs.set_bits(regs::RCTL, regs::RCTL_EN);

    log::info!(
        target: "e1000",
        "attached: mac {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}, tx {} / rx {} descriptors",
        mac[0],
        mac[1],
        mac[2],
        mac[3],
        mac[4],
        mac[5],
        TX,
        RX
    );

    Ok(E1000InitResult {
        mac,
        tx_ring,
        rx_ring,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// EEPROM
// ═══════════════════════════════════════════════════════════════════════════

/// Read one 16-bit EEPROM word through `EERD`.
pub fn read_eeprom_word<W: RegisterWindow>(
    regs: &mut W,
    word: u8,
    poll_limit: u32,
) -> Result<u16, AttachError> {
    regs.write32(
        regs::EERD,
        ((word as u32) << regs::EERD_ADDR_SHIFT) | regs::EERD_START,
    );
    for _ in 0..poll_limit {
        let value = regs.read32(regs::EERD);
        if value & regs::EERD_DONE != 0 {
            return Ok((value >> regs::EERD_DATA_SHIFT) as u16);
        }
        core::hint::spin_loop();
    }
    log::error!(target: "e1000", "EEPROM word {} never completed", word);
    Err(AttachError::EepromTimeout { word })
}

/// Read the burned-in MAC: EEPROM words 0..3, low byte first.
pub fn read_mac<W: RegisterWindow>(regs: &mut W, poll_limit: u32) -> Result<MacAddress, AttachError> {
    let mut mac = [0u8; 6];
    for (i, pair) in mac.chunks_exact_mut(2).enumerate() {
        let word = read_eeprom_word(regs, i as u8, poll_limit)?;
        pair.copy_from_slice(&word.to_le_bytes());
    }
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferArena;
    use crate::descriptor::{Ownership, CMD_EOP, CMD_RS};
    use crate::testing::{test_pool, SimRegisters, SIM_MAC};

    fn pages_for<const TX: usize, const RX: usize>() -> usize {
        2 + BufferArena::<TX>::pages_needed() + BufferArena::<RX>::pages_needed()
    }

    #[test]
    fn test_read_mac_low_byte_first() {
        let mut regs = SimRegisters::with_eeprom([0x1452, 0x1200, 0x5634]);
        assert_eq!(
            read_mac(&mut regs, 10),
            Ok([0x52, 0x14, 0x00, 0x12, 0x34, 0x56])
        );
    }

    #[test]
    fn test_eeprom_timeout() {
        let mut regs = SimRegisters::new();
        regs.set_eeprom_stuck(true);
        assert_eq!(
            read_eeprom_word(&mut regs, 2, 50),
            Err(AttachError::EepromTimeout { word: 2 })
        );
        assert_eq!(
            read_mac(&mut regs, 50),
            Err(AttachError::EepromTimeout { word: 0 })
        );
    }

    #[test]
    fn test_register_program() {
        let mut regs = SimRegisters::new();
        let mut pool = test_pool(pages_for::<8, 16>());
        let config = E1000Config::default();
        let result = init_e1000::<_, _, 8, 16>(&mut regs, &mut pool, &config).unwrap();

        assert_eq!(result.mac, SIM_MAC);
        assert_eq!(pool.free_pages(), 0);

        let ims = regs.read32(regs::IMS);
        assert_eq!(ims & (regs::IMS_RXT0 | regs::IMS_SRPD), regs::IMS_RXT0 | regs::IMS_SRPD);
        assert_eq!(regs.read32(regs::RSRPD), 1518);

        assert_eq!(regs.read32(regs::TDLEN), 8 * 16);
        assert_eq!(regs.read32(regs::TDH), 0);
        assert_eq!(regs.read32(regs::TDT), 0);
        assert_eq!(
            regs.read32(regs::TCTL),
            regs::TCTL_EN | regs::TCTL_PSP | (0x10 << 4) | (0x40 << 12)
        );
        assert_eq!(regs.read32(regs::TIPG), 10);

        assert_eq!(regs.read32(regs::RAL0), u32::from_le_bytes([SIM_MAC[0], SIM_MAC[1], SIM_MAC[2], SIM_MAC[3]]));
        assert_eq!(
            regs.read32(regs::RAH0),
            u16::from_le_bytes([SIM_MAC[4], SIM_MAC[5]]) as u32 | regs::RAH_AV
        );
        assert_eq!(regs.read32(regs::MTA), 0);
        assert_eq!(regs.read32(regs::RDLEN), 16 * 16);
        assert_eq!(regs.read32(regs::RDH), 0);
        assert_eq!(regs.read32(regs::RDT), 15);
        assert_eq!(
            regs.read32(regs::RCTL),
            regs::RCTL_EN | regs::RCTL_SECRC | regs::RCTL_BSIZE_2048
        );

        for i in 0..8 {
            assert_eq!(result.tx_ring.ownership(i), Ownership::Software);
            assert_eq!(result.tx_ring.descriptor(i).cmd, CMD_RS | CMD_EOP);
        }
        for i in 0..16 {
            assert_eq!(result.rx_ring.ownership(i), Ownership::Device);
        }
    }

    #[test]
    fn test_ring_bases_split_into_low_and_high() {
        let mut regs = SimRegisters::new();
        let mut pool = test_pool(pages_for::<8, 8>());
        init_e1000::<_, _, 8, 8>(&mut regs, &mut pool, &E1000Config::default()).unwrap();

        let tx_base = (regs.read32(regs::TDBAH) as u64) << 32 | regs.read32(regs::TDBAL) as u64;
        let rx_base = (regs.read32(regs::RDBAH) as u64) << 32 | regs.read32(regs::RDBAL) as u64;
        assert_eq!(tx_base % 4096, 0);
        assert_eq!(rx_base % 4096, 0);
        assert_ne!(tx_base, rx_base);
    }

    #[test]
    fn test_out_of_pages_leaves_device_untouched() {
        let mut regs = SimRegisters::new();
        let mut pool = test_pool(pages_for::<8, 8>() - 1);
        let result = init_e1000::<_, _, 8, 8>(&mut regs, &mut pool, &E1000Config::default());
        assert_eq!(result.err(), Some(AttachError::OutOfPages));
        assert_eq!(regs.total_writes(), 0);
    }

    #[test]
    fn test_stuck_eeprom_fails_attach() {
        let mut regs = SimRegisters::new();
        regs.set_eeprom_stuck(true);
        let mut pool = test_pool(pages_for::<8, 8>());
        let config = E1000Config {
            eeprom_poll_limit: 16,
            ..Default::default()
        };
        let result = init_e1000::<_, _, 8, 8>(&mut regs, &mut pool, &config);
        assert_eq!(result.err(), Some(AttachError::EepromTimeout { word: 0 }));
        assert_eq!(regs.read32(regs::RCTL) & regs::RCTL_EN, 0);
    }
}
