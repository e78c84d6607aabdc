//! Network syscall surface.
//!
//! User environments reach the driver through seven numbered calls. Each
//! returns a non-negative value on success or a negated [`ErrorCode`].
//! Raw user buffers arrive as `Option` slices (`None` for a null pointer)
//! together with the size the caller claimed.

use crate::driver::E1000Driver;
use crate::error::ErrorCode;
use crate::mmio::RegisterWindow;
use crate::platform::EnvId;

/// Syscall numbers, continuing the kernel's base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NetSyscall {
    SendPacket = 15,
    RecvPacket = 16,
    GetMac = 17,
    EnableNonBlocking = 18,
    DisableNonBlocking = 19,
    SetInputTarget = 20,
    AddFilter = 21,
}

impl NetSyscall {
    pub const fn number(self) -> u32 {
        self as u32
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Some(match number {
            15 => Self::SendPacket,
            16 => Self::RecvPacket,
            17 => Self::GetMac,
            18 => Self::EnableNonBlocking,
            19 => Self::DisableNonBlocking,
            20 => Self::SetInputTarget,
            21 => Self::AddFilter,
            _ => return None,
        })
    }
}

/// Decoded arguments of one network syscall.
#[derive(Debug)]
pub enum NetRequest<'a> {
    SendPacket { buf: Option<&'a [u8]>, size: usize },
    RecvPacket { buf: Option<&'a mut [u8]>, size: usize },
    GetMac { out: Option<&'a mut [u8]> },
    EnableNonBlocking,
    DisableNonBlocking,
    SetInputTarget(EnvId),
    AddFilter { address: u32, port: u16 },
}

impl NetRequest<'_> {
    pub fn syscall(&self) -> NetSyscall {
        match self {
            Self::SendPacket { .. } => NetSyscall::SendPacket,
            Self::RecvPacket { .. } => NetSyscall::RecvPacket,
            Self::GetMac { .. } => NetSyscall::GetMac,
            Self::EnableNonBlocking => NetSyscall::EnableNonBlocking,
            Self::DisableNonBlocking => NetSyscall::DisableNonBlocking,
            Self::SetInputTarget(_) => NetSyscall::SetInputTarget,
            Self::AddFilter { .. } => NetSyscall::AddFilter,
        }
    }
}

/// Route `request` to the attached driver, if there is one.
pub fn dispatch<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: Option<&mut E1000Driver<W, TX, RX, F>>,
    request: NetRequest<'_>,
) -> i32 {
    let Some(driver) = driver else {
        log::debug!(target: "e1000", "{:?} with no device attached", request.syscall());
        return ErrorCode::NotAttached.as_errno();
    };
    match request {
        NetRequest::SendPacket { buf, size } => sys_send_packet(driver, buf, size),
        NetRequest::RecvPacket { buf, size } => sys_recv_packet(driver, buf, size),
        NetRequest::GetMac { out } => sys_get_mac(driver, out),
        NetRequest::EnableNonBlocking => sys_enable_non_blocking(driver),
        NetRequest::DisableNonBlocking => sys_disable_non_blocking(driver),
        NetRequest::SetInputTarget(env) => sys_set_input_target(driver, env),
        NetRequest::AddFilter { address, port } => sys_add_filter(driver, address, port),
    }
}

/// Returns the number of bytes queued.
pub fn sys_send_packet<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
    buf: Option<&[u8]>,
    size: usize,
) -> i32 {
    let Some(buf) = buf else {
        return ErrorCode::InvalidBuffer.as_errno();
    };
    if size > crate::regs::MAX_FRAME_SIZE {
        return ErrorCode::PacketTooLarge.as_errno();
    }
    // Claimed size runs past the mapped buffer.
    let Some(frame) = buf.get(..size) else {
        return ErrorCode::CopyFailed.as_errno();
    };
    match driver.send_packet(frame) {
        Ok(len) => len as i32,
        Err(err) => ErrorCode::from(err).as_errno(),
    }
}

/// Returns the number of bytes copied into `buf`.
pub fn sys_recv_packet<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
    buf: Option<&mut [u8]>,
    size: usize,
) -> i32 {
    let Some(buf) = buf else {
        return ErrorCode::InvalidBuffer.as_errno();
    };
    let capacity = size.min(buf.len());
    match driver.receive_packet(&mut buf[..capacity]) {
        Ok(len) => len as i32,
        Err(err) => ErrorCode::from(err).as_errno(),
    }
}

/// Copies the MAC into the first six bytes of `out`.
pub fn sys_get_mac<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
    out: Option<&mut [u8]>,
) -> i32 {
    match out.and_then(|out| out.get_mut(..6)) {
        Some(out) => {
            out.copy_from_slice(&driver.mac_address());
            0
        }
        None => ErrorCode::InvalidBuffer.as_errno(),
    }
}

pub fn sys_enable_non_blocking<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
) -> i32 {
    driver.enable_non_blocking_mode();
    0
}

/// Returns the previous flag value (0 or 1).
pub fn sys_disable_non_blocking<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
) -> i32 {
    driver.disable_non_blocking_mode() as i32
}

pub fn sys_set_input_target<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
    env: EnvId,
) -> i32 {
    driver.set_input_target(env);
    0
}

pub fn sys_add_filter<W: RegisterWindow, const TX: usize, const RX: usize, const F: usize>(
    driver: &mut E1000Driver<W, TX, RX, F>,
    address: u32,
    port: u16,
) -> i32 {
    match driver.add_filter(address, port) {
        Ok(()) => 0,
        Err(err) => ErrorCode::from(err).as_errno(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferArena;
    use crate::init::E1000Config;
    use crate::regs::MAX_FRAME_SIZE;
    use crate::testing::{frame_from, test_pool, SimDevice, SimRegisters, SIM_MAC};

    type TestDriver = E1000Driver<SimRegisters, 8, 8, 2>;

    fn attach() -> (TestDriver, SimDevice) {
        let regs = SimRegisters::new();
        let device = regs.device();
        let mut pool = test_pool(2 + 2 * BufferArena::<8>::pages_needed());
        (TestDriver::attach(regs, &mut pool, &E1000Config::default()).unwrap(), device)
    }

    #[test]
    fn test_numbers_match_table() {
        assert_eq!(NetSyscall::SendPacket.number(), 15);
        assert_eq!(NetSyscall::AddFilter.number(), 21);
        for n in 15..=21 {
            assert_eq!(NetSyscall::from_number(n).map(NetSyscall::number), Some(n));
        }
        assert_eq!(NetSyscall::from_number(14), None);
        assert_eq!(NetSyscall::from_number(22), None);
    }

    #[test]
    fn test_send_validation() {
        let (mut driver, device) = attach();
        let big = [0u8; MAX_FRAME_SIZE + 1];

        assert_eq!(sys_send_packet(&mut driver, None, 10), ErrorCode::InvalidBuffer.as_errno());
        assert_eq!(
            sys_send_packet(&mut driver, Some(&big), big.len()),
            ErrorCode::PacketTooLarge.as_errno()
        );
        assert_eq!(sys_send_packet(&mut driver, Some(b"abc"), 4), ErrorCode::CopyFailed.as_errno());
        assert_eq!(device.tx_pending(), 0);

        assert_eq!(sys_send_packet(&mut driver, Some(b"abcdef"), 4), 4);
        assert_eq!(device.complete_tx(), std::vec![b"abcd".to_vec()]);
    }

    #[test]
    fn test_send_ring_full_code() {
        let (mut driver, _) = attach();
        for _ in 0..8 {
            assert_eq!(sys_send_packet(&mut driver, Some(&[1; 60]), 60), 60);
        }
        let rc = sys_send_packet(&mut driver, Some(&[1; 60]), 60);
        assert_eq!(ErrorCode::from_errno(rc), Some(ErrorCode::RingFull));
        assert!(ErrorCode::RingFull.is_retryable());
    }

    #[test]
    fn test_recv_clamps_capacity() {
        let (mut driver, device) = attach();
        let mut buf = [0u8; 16];
        assert_eq!(sys_recv_packet(&mut driver, None, 16), ErrorCode::InvalidBuffer.as_errno());
        assert_eq!(sys_recv_packet(&mut driver, Some(&mut buf), 16), ErrorCode::RingEmpty.as_errno());

        let frame = frame_from(0x0A00_0001, 80, b"hello");
        assert!(device.deliver_rx(&frame));
        // Claimed capacity larger than the real buffer.
        assert_eq!(sys_recv_packet(&mut driver, Some(&mut buf), 4096), 16);
        assert_eq!(&buf[..], &frame[..16]);
    }

    #[test]
    fn test_filter_and_blacklist_codes() {
        let (mut driver, device) = attach();
        assert_eq!(sys_add_filter(&mut driver, 0x0A00_0001, 0), 0);
        assert_eq!(sys_add_filter(&mut driver, 0, 443), 0);
        assert_eq!(sys_add_filter(&mut driver, 1, 1), ErrorCode::FilterTableFull.as_errno());

        assert!(device.deliver_rx(&frame_from(0x0A00_0001, 80, b"")));
        let mut buf = [0u8; 64];
        assert_eq!(sys_recv_packet(&mut driver, Some(&mut buf), 64), ErrorCode::Blacklisted.as_errno());
    }

    #[test]
    fn test_mac_and_flags() {
        let (mut driver, _) = attach();
        let mut mac = [0u8; 8];
        assert_eq!(sys_get_mac(&mut driver, Some(&mut mac)), 0);
        assert_eq!(&mac[..6], &SIM_MAC);
        assert_eq!(sys_get_mac(&mut driver, Some(&mut mac[..5])), ErrorCode::InvalidBuffer.as_errno());
        assert_eq!(sys_get_mac(&mut driver, None), ErrorCode::InvalidBuffer.as_errno());

        assert_eq!(sys_disable_non_blocking(&mut driver), 0);
        assert_eq!(sys_enable_non_blocking(&mut driver), 0);
        assert_eq!(sys_disable_non_blocking(&mut driver), 1);
        assert_eq!(sys_set_input_target(&mut driver, EnvId(0x1004)), 0);
        assert_eq!(driver.input_target(), Some(EnvId(0x1004)));
    }

    #[test]
    fn test_dispatch() {
        let (mut driver, _) = attach();
        assert_eq!(
            dispatch::<SimRegisters, 8, 8, 2>(None, NetRequest::EnableNonBlocking),
            ErrorCode::NotAttached.as_errno()
        );

        let request = NetRequest::AddFilter { address: 5, port: 0 };
        assert_eq!(request.syscall(), NetSyscall::AddFilter);
        assert_eq!(dispatch(Some(&mut driver), request), 0);
        assert_eq!(driver.filters().len(), 1);

        assert_eq!(dispatch(Some(&mut driver), NetRequest::EnableNonBlocking), 0);
        assert_eq!(dispatch(Some(&mut driver), NetRequest::DisableNonBlocking), 1);

        let mut mac = [0u8; 6];
        assert_eq!(dispatch(Some(&mut driver), NetRequest::GetMac { out: Some(&mut mac) }), 0);
        assert_eq!(mac, SIM_MAC);
    }
}
