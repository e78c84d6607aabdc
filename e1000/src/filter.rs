//! Inbound blacklist.
//!
//! # Frame layout assumption
//!
//! ```text
//! 0               14                          34            38
//! | Ethernet (14) | IPv4, no options (20)     | TCP/UDP ... |
//!                 |            [30..34] addr  | [36..38] port
//! ```
//!
//! The filter reads a big-endian 32-bit address at byte 30 and a big-endian
//! 16-bit port at byte 36. Nothing else in a frame is interpreted. Frames
//! with IP options or non-TCP/UDP payloads are inspected at the same offsets
//! regardless. A field that lies past the end of the frame is not compared,
//! so a 34..38 byte frame is checked by address only and anything shorter
//! passes.
//!
//! # Matching
//!
//! Matching is per field: a frame is dropped if its address equals *any*
//! entry's address, or its port equals *any* entry's port. A zero field in an
//! entry never matches, so `(addr, 0)` blocks an address on every port and
//! `(0, port)` blocks a port from every address.

/// Absolute offset of the inspected IPv4 address.
pub const FILTER_ADDR_OFFSET: usize = 14 + 16;

/// Absolute offset of the inspected transport port.
pub const FILTER_PORT_OFFSET: usize = 14 + 20 + 2;

/// Shortest frame that carries the inspected address.
pub const MIN_ADDRESS_LEN: usize = FILTER_ADDR_OFFSET + 4;

/// Shortest frame that carries both inspected fields.
pub const MIN_FILTERED_LEN: usize = FILTER_PORT_OFFSET + 2;

/// Big-endian 32-bit read, assembled byte by byte.
#[inline]
fn be32(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 24 | (bytes[1] as u32) << 16 | (bytes[2] as u32) << 8 | bytes[3] as u32
}

/// Big-endian 16-bit read, assembled byte by byte.
#[inline]
fn be16(bytes: &[u8]) -> u16 {
    (bytes[0] as u16) << 8 | bytes[1] as u16
}

/// Inspected address in host order, if the frame reaches byte 34.
pub fn inspected_address(frame: &[u8]) -> Option<u32> {
    frame.get(FILTER_ADDR_OFFSET..MIN_ADDRESS_LEN).map(be32)
}

/// Inspected port in host order, if the frame reaches byte 38.
pub fn inspected_port(frame: &[u8]) -> Option<u16> {
    frame.get(FILTER_PORT_OFFSET..MIN_FILTERED_LEN).map(be16)
}

/// Address and port inspected by the filter. Each field is `None` when the
/// frame ends before it.
pub fn inspected_fields(frame: &[u8]) -> (Option<u32>, Option<u16>) {
    (inspected_address(frame), inspected_port(frame))
}

/// One blacklist entry. `(0, 0)` marks an unused slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterEntry {
    /// IPv4 address in host order, 0 = not filtering by address.
    pub address: u32,
    /// Port in host order, 0 = not filtering by port.
    pub port: u16,
}

impl FilterEntry {
    /// The unused-slot sentinel.
    pub const UNUSED: Self = Self { address: 0, port: 0 };

    pub const fn new(address: u32, port: u16) -> Self {
        Self { address, port }
    }

    #[inline]
    pub fn is_unused(&self) -> bool {
        *self == Self::UNUSED
    }

    #[inline]
    fn blocks_address(&self, address: u32) -> bool {
        self.address != 0 && self.address == address
    }

    #[inline]
    fn blocks_port(&self, port: u16) -> bool {
        self.port != 0 && self.port == port
    }
}

/// Fixed-capacity blacklist.
#[derive(Debug, Clone)]
pub struct FilterTable<const N: usize> {
    entries: [FilterEntry; N],
}

impl<const N: usize> FilterTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: [FilterEntry::UNUSED; N],
        }
    }

    /// Store `(address, port)` in the first unused slot.
    ///
    /// Adding `(0, 0)` is accepted and changes nothing.
    pub fn add(&mut self, address: u32, port: u16) -> Result<(), crate::error::FilterError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| entry.is_unused())
            .ok_or(crate::error::FilterError::TableFull)?;
        *slot = FilterEntry::new(address, port);
        Ok(())
    }

    /// True if any entry blocks this address.
    pub fn matches_address(&self, address: u32) -> bool {
        self.entries.iter().any(|entry| entry.blocks_address(address))
    }

    /// True if any entry blocks this port.
    pub fn matches_port(&self, port: u16) -> bool {
        self.entries.iter().any(|entry| entry.blocks_port(port))
    }

    /// True if any entry blocks this address or this port.
    pub fn matches(&self, address: u32, port: u16) -> bool {
        self.matches_address(address) || self.matches_port(port)
    }

    /// True if the frame must be dropped.
    ///
    /// Only fields that lie inside the frame are compared: a frame ending
    /// between bytes 34 and 38 is still checked by address.
    pub fn is_blacklisted(&self, frame: &[u8]) -> bool {
        inspected_address(frame).is_some_and(|address| self.matches_address(address))
            || inspected_port(frame).is_some_and(|port| self.matches_port(port))
    }

    /// Entries in use, in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &FilterEntry> {
        self.entries.iter().filter(|entry| !entry.is_unused())
    }

    /// Number of entries in use.
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for FilterTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
