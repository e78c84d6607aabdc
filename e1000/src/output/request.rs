//! Inbound requests from the network server.
//!
//! # Packet page layout
//! ```text
//! 0        4
//! | len:i32 | data[len] ... |      (len little-endian, 0 <= len <= PAGE_SIZE - 4)
//! ```

use core::fmt;

use crate::platform::{EnvId, PAGE_SIZE};

/// Request kind for "transmit the packet in this page".
pub const NSREQ_OUTPUT: u32 = 11;

const LEN_FIELD: usize = 4;

/// One message received from another environment.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    /// Sender identity.
    pub from: EnvId,
    /// Request kind (the message value).
    pub kind: u32,
    /// Page mapped along with the message, if any.
    pub page: Option<&'a [u8]>,
}

/// Blocking message receive.
pub trait RequestSource {
    type Error: fmt::Display;

    /// Wait for the next message. The returned page stays valid until the
    /// next call.
    fn receive_request(&mut self) -> Result<InboundRequest<'_>, Self::Error>;
}

/// Why a request was refused before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Sender is not the network server.
    WrongSender(EnvId),
    /// Kind other than [`NSREQ_OUTPUT`].
    WrongKind(u32),
    /// No page came with the message.
    NoPage,
    /// Length field negative or larger than the page can hold.
    BadLength(i32),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongSender(env) => write!(f, "request from {} ignored", env),
            Self::WrongKind(kind) => write!(f, "unexpected request kind {}", kind),
            Self::NoPage => write!(f, "request carries no page"),
            Self::BadLength(len) => write!(f, "packet length {} out of range", len),
        }
    }
}

impl<'a> InboundRequest<'a> {
    /// Check sender, kind and page, and return the packet payload.
    pub fn validate(&self, server: EnvId) -> Result<&'a [u8], Rejection> {
        if self.from != server {
            return Err(Rejection::WrongSender(self.from));
        }
        if self.kind != NSREQ_OUTPUT {
            return Err(Rejection::WrongKind(self.kind));
        }
        let page = self.page.ok_or(Rejection::NoPage)?;
        parse_packet(page)
    }
}

/// Extract the payload from a packet page.
pub fn parse_packet(page: &[u8]) -> Result<&[u8], Rejection> {
    let header: [u8; LEN_FIELD] = match page.get(..LEN_FIELD) {
        Some(bytes) => [bytes[0], bytes[1], bytes[2], bytes[3]],
        None => return Err(Rejection::BadLength(-1)),
    };
    let len = i32::from_le_bytes(header);
    let limit = page.len().min(PAGE_SIZE) - LEN_FIELD;
    if len < 0 || len as usize > limit {
        return Err(Rejection::BadLength(len));
    }
    Ok(&page[LEN_FIELD..LEN_FIELD + len as usize])
}
