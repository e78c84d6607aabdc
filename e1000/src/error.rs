//! Driver error types.
//!
//! Ring and filter operations return small `Copy` enums. The syscall layer
//! flattens them into [`ErrorCode`], the negative integers handed back to
//! user environments.

use core::fmt;

// ═══════════════════════════════════════════════════════════════════════════
// TX / RX
// ═══════════════════════════════════════════════════════════════════════════

/// Transmit errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// No buffer was supplied.
    InvalidBuffer,
    /// Frame exceeds the maximum single-frame size.
    PacketTooLarge {
        /// Requested length.
        len: usize,
        /// Largest accepted length.
        max: usize,
    },
    /// Slot at the tail is still owned by the device. Retry later.
    RingFull,
    /// The declared length could not be copied out of the caller's buffer.
    CopyFailed,
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "invalid transmit buffer"),
            Self::PacketTooLarge { len, max } => {
                write!(f, "packet of {} bytes exceeds {} byte limit", len, max)
            }
            Self::RingFull => write!(f, "transmit ring full"),
            Self::CopyFailed => write!(f, "copy from caller buffer failed"),
        }
    }
}

/// Receive errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// No buffer was supplied.
    InvalidBuffer,
    /// No completed frame at the candidate slot. Poll again later.
    RingEmpty,
    /// Frame spans several descriptors; dropped and slot reclaimed.
    OversizeFrame,
    /// Frame matched the blacklist; dropped and slot reclaimed.
    Blacklisted,
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "invalid receive buffer"),
            Self::RingEmpty => write!(f, "receive ring empty"),
            Self::OversizeFrame => write!(f, "multi-descriptor frame dropped"),
            Self::Blacklisted => write!(f, "frame dropped by blacklist"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FILTER / ATTACH
// ═══════════════════════════════════════════════════════════════════════════

/// Filter table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// Every slot holds an entry.
    TableFull,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "filter table full"),
        }
    }
}

/// Attach errors. Both are fatal to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The page allocator could not back the rings.
    OutOfPages,
    /// EEPROM never reported a completed read.
    EepromTimeout {
        /// Word that was being read.
        word: u8,
    },
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfPages => write!(f, "out of DMA pages for descriptor rings"),
            Self::EepromTimeout { word } => write!(f, "EEPROM read of word {} timed out", word),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NUMERIC CODES
// ═══════════════════════════════════════════════════════════════════════════

/// Error codes returned (negated) by the network syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    InvalidBuffer = 1,
    PacketTooLarge = 2,
    RingFull = 3,
    CopyFailed = 4,
    RingEmpty = 5,
    OversizeFrame = 6,
    Blacklisted = 7,
    FilterTableFull = 8,
    NotAttached = 9,
}

impl ErrorCode {
    /// Value returned to the caller (always negative).
    pub const fn as_errno(self) -> i32 {
        -(self as i32)
    }

    /// Decode a negative syscall return value.
    pub fn from_errno(value: i32) -> Option<Self> {
        Some(match value.checked_neg()? {
            1 => Self::InvalidBuffer,
            2 => Self::PacketTooLarge,
            3 => Self::RingFull,
            4 => Self::CopyFailed,
            5 => Self::RingEmpty,
            6 => Self::OversizeFrame,
            7 => Self::Blacklisted,
            8 => Self::FilterTableFull,
            9 => Self::NotAttached,
            _ => return None,
        })
    }

    /// Capacity conditions the caller is expected to retry.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RingFull | Self::RingEmpty)
    }
}

impl From<TxError> for ErrorCode {
    fn from(err: TxError) -> Self {
        match err {
            TxError::InvalidBuffer => Self::InvalidBuffer,
            TxError::PacketTooLarge { .. } => Self::PacketTooLarge,
            TxError::RingFull => Self::RingFull,
            TxError::CopyFailed => Self::CopyFailed,
        }
    }
}

impl From<RxError> for ErrorCode {
    fn from(err: RxError) -> Self {
        match err {
            RxError::InvalidBuffer => Self::InvalidBuffer,
            RxError::RingEmpty => Self::RingEmpty,
            RxError::OversizeFrame => Self::OversizeFrame,
            RxError::Blacklisted => Self::Blacklisted,
        }
    }
}

impl From<FilterError> for ErrorCode {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::TableFull => Self::FilterTableFull,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.as_errno())
    }
}
