//! The packet record produced by the receive path.

use std::fmt;

use super::addr::Address;
use super::socket::SocketHandle;

/// Fixed capacity of the receive buffer. Payloads beyond this are truncated,
/// never grown — the ceiling is not negotiated.
pub const RX_BUFFER_SIZE: usize = 1472;

/// One received datagram: payload bytes plus resolved source and
/// destination addresses and the interface it arrived on.
///
/// Built in place by the receive path and consumed immediately by the
/// protocol library's parser; it does not outlive one read call.
pub struct Packet {
    payload: [u8; RX_BUFFER_SIZE],
    length: usize,
    src: Address,
    dst: Address,
    iface: SocketHandle,
}

impl Packet {
    pub(crate) fn new(src: Address, dst: Address, iface: SocketHandle) -> Self {
        Self {
            payload: [0u8; RX_BUFFER_SIZE],
            length: 0,
            src,
            dst,
            iface,
        }
    }

    /// Appends payload bytes, stopping at the buffer ceiling. Returns how
    /// many bytes were actually copied.
    pub(crate) fn append_payload(&mut self, bytes: &[u8]) -> usize {
        let room = RX_BUFFER_SIZE - self.length;
        let n = bytes.len().min(room);
        self.payload[self.length..self.length + n].copy_from_slice(&bytes[..n]);
        self.length += n;
        n
    }

    /// The effective payload. Zero-length is a valid, empty receive.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.length]
    }

    /// Effective payload length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// `true` when the datagram carried no payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Source address, normalized with the transport source port.
    #[must_use]
    pub const fn src(&self) -> Address {
        self.src
    }

    /// Destination address, normalized with the transport destination port.
    #[must_use]
    pub const fn dst(&self) -> Address {
        self.dst
    }

    /// Handle of the socket the datagram arrived on.
    #[must_use]
    pub const fn iface(&self) -> SocketHandle {
        self.iface
    }
}

// Metadata only; never dump the payload buffer.
impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.length)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("iface", &self.iface)
            .finish()
    }
}
