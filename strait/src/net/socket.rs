//! Sockets and bound endpoints.
//!
//! A [`Socket`] wraps a non-blocking UDP socket together with the flag set
//! and pending fragment chain the event loop and receive path operate on.
//! The socket itself is owned by the protocol library; this layer mutates
//! flags and the pending chain under the rules below.
//!
//! Flag discipline: `CAN_READ` is set only by the dispatch phase of the
//! event loop (crate-internal) and cleared only by the receive call that
//! consumes it. `WANT_READ`/`WANT_WRITE` are owned by the protocol library.
//! `CONNECTED` is set by [`Socket::connect`].

use std::fmt;
use std::io;

use bitflags::bitflags;
use mio::net::UdpSocket as MioUdpSocket;

use crate::stack::snip::Chain;

use super::addr::Address;

bitflags! {
    /// Mode and readiness flags of one socket.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SocketFlags: u16 {
        /// The socket has a fixed peer; sends ignore the session address.
        const CONNECTED = 1 << 0;
        /// The protocol library wants inbound data on this socket.
        const WANT_READ = 1 << 1;
        /// The protocol library has outbound data pending on this socket.
        const WANT_WRITE = 1 << 2;
        /// An inbound datagram is attached and one receive call may drain it.
        const CAN_READ = 1 << 3;
    }
}

/// Opaque identifier for one socket across the protocol-library boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SocketHandle(u32);

impl SocketHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value, for logging and map keys.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-blocking UDP socket with the flags and pending-datagram slot this
/// layer manages.
#[derive(Debug)]
pub struct Socket {
    handle: SocketHandle,
    io: MioUdpSocket,
    flags: SocketFlags,
    pending: Option<Chain>,
}

impl Socket {
    /// Binds a new socket to the given local address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound (e.g., address in use).
    pub fn bind(handle: SocketHandle, addr: Address) -> io::Result<Self> {
        let io = MioUdpSocket::bind(addr.into())?;
        Ok(Self {
            handle,
            io,
            flags: SocketFlags::empty(),
            pending: None,
        })
    }

    /// Fixes the socket's peer. Subsequent sends use the connected peer and
    /// ignore the session address.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connect fails.
    pub fn connect(&mut self, peer: Address) -> io::Result<()> {
        self.io.connect(peer.into())?;
        self.flags.insert(SocketFlags::CONNECTED);
        Ok(())
    }

    /// Returns this socket's handle.
    #[must_use]
    pub const fn handle(&self) -> SocketHandle {
        self.handle
    }

    /// Returns the local address this socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be retrieved.
    pub fn local_addr(&self) -> io::Result<Address> {
        self.io.local_addr().map(Address::from)
    }

    /// Current flag set.
    #[must_use]
    pub const fn flags(&self) -> SocketFlags {
        self.flags
    }

    /// Declares whether the protocol library wants inbound data here.
    pub fn set_want_read(&mut self, want: bool) {
        self.flags.set(SocketFlags::WANT_READ, want);
    }

    /// Declares whether the protocol library has outbound data pending.
    pub fn set_want_write(&mut self, want: bool) {
        self.flags.set(SocketFlags::WANT_WRITE, want);
    }

    /// Attaches an inbound datagram and marks the socket readable.
    ///
    /// Dispatch-only: taking the chain by value makes a second claim of the
    /// same datagram unrepresentable.
    pub(crate) fn mark_readable(&mut self, chain: Chain) {
        self.flags.insert(SocketFlags::CAN_READ);
        self.pending = Some(chain);
    }

    /// Clears the readable flag. Receive-path only.
    pub(crate) fn clear_readable(&mut self) {
        self.flags.remove(SocketFlags::CAN_READ);
    }

    /// Takes the pending datagram, leaving the slot empty. Receive-path only.
    pub(crate) fn take_pending(&mut self) -> Option<Chain> {
        self.pending.take()
    }

    /// Connected send to the fixed peer.
    pub(crate) fn transmit(&self, buf: &[u8]) -> io::Result<usize> {
        self.io.send(buf)
    }

    /// Addressed send to `peer`.
    pub(crate) fn transmit_to(&self, buf: &[u8], peer: Address) -> io::Result<usize> {
        self.io.send_to(buf, peer.into())
    }
}

/// A local bound address paired with the socket handling its traffic.
///
/// The protocol context holds an unordered collection of these; dispatch
/// walks it to route an arrived datagram by destination port.
#[derive(Debug)]
pub struct Endpoint {
    bind_addr: Address,
    socket: Socket,
}

impl Endpoint {
    /// Binds an endpoint, recording the actual local address (so binding
    /// port 0 yields the OS-assigned port for dispatch comparisons).
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails or the local address cannot be
    /// read back.
    pub fn bind(handle: SocketHandle, addr: Address) -> io::Result<Self> {
        let socket = Socket::bind(handle, addr)?;
        let bind_addr = socket.local_addr()?;
        Ok(Self { bind_addr, socket })
    }

    /// The bound local address.
    #[must_use]
    pub const fn bind_addr(&self) -> Address {
        self.bind_addr
    }

    /// The endpoint's socket.
    #[must_use]
    pub const fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Mutable access to the endpoint's socket.
    pub fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }
}
