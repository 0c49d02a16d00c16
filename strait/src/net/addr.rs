//! Address and port types shared across the send, receive, and dispatch
//! paths.
//!
//! Transport ports cross this layer in on-wire (network) byte order: the
//! destination port of an arrived datagram is compared against bound
//! endpoint ports without ever swapping to host order. [`WirePort`] makes
//! that representation explicit so host-order and wire-order values cannot
//! be mixed up silently.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// A transport port held in on-wire (big-endian) byte order.
///
/// Equality compares the wire representation, so a port parsed straight out
/// of a transport header and a port converted from a bound address agree
/// without any byte swapping in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct WirePort(u16);

impl WirePort {
    /// Converts a host-order port into its wire representation.
    #[must_use]
    pub const fn from_host(port: u16) -> Self {
        Self(port.to_be())
    }

    /// Wraps the two raw bytes of a port field as they appeared on the wire.
    #[must_use]
    pub const fn from_wire(bytes: [u8; 2]) -> Self {
        Self(u16::from_ne_bytes(bytes))
    }

    /// Returns the port in host byte order.
    #[must_use]
    pub const fn to_host(self) -> u16 {
        u16::from_be(self.0)
    }

    /// Returns the port bytes in wire order.
    #[must_use]
    pub const fn wire_bytes(self) -> [u8; 2] {
        self.0.to_ne_bytes()
    }
}

impl fmt::Display for WirePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_host())
    }
}

/// A network address (IP + port), tagged by address family.
///
/// Wrapper around [`SocketAddr`], which is already a proper variant type
/// keyed by family — the populated variant is unambiguous by construction
/// and no byte of the address can be left uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(SocketAddr);

impl Address {
    /// Creates a new address from an IP and a host-order port.
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(ip, port))
    }

    /// Creates the normalized form used for inbound packet records: the
    /// IPv6 variant with flow info and scope id zeroed.
    #[must_use]
    pub const fn from_ipv6(ip: Ipv6Addr, port: WirePort) -> Self {
        Self(SocketAddr::V6(SocketAddrV6::new(ip, port.to_host(), 0, 0)))
    }

    /// Creates an IPv4 loopback address on the given port.
    #[must_use]
    pub const fn localhost(port: u16) -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::LOCALHOST,
            port,
        )))
    }

    /// Creates an address bound to all IPv4 interfaces on the given port.
    #[must_use]
    pub const fn any(port: u16) -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::UNSPECIFIED,
            port,
        )))
    }

    /// Returns the IP address.
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    /// Returns the port in host byte order.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.0.port()
    }

    /// Returns the port in wire byte order.
    ///
    /// Dispatch compares bound ports against transport-header ports through
    /// this accessor only.
    #[must_use]
    pub const fn wire_port(&self) -> WirePort {
        WirePort::from_host(self.0.port())
    }

    /// Returns the underlying [`SocketAddr`].
    #[must_use]
    pub const fn as_socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<Address> for SocketAddr {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The remote-peer addressing context for one socket-level exchange.
///
/// Owned by the protocol library; the send path reads the peer address for
/// unconnected sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    remote: Address,
}

impl Session {
    /// Creates a session for the given peer.
    #[must_use]
    pub const fn new(remote: Address) -> Self {
        Self { remote }
    }

    /// Returns the peer address.
    #[must_use]
    pub const fn remote(&self) -> Address {
        self.remote
    }
}
