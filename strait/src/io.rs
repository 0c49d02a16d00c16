//! The send and receive paths.
//!
//! `send` transmits an opaque buffer to a socket's peer. `receive` consumes
//! the fragment chain dispatch attached to a socket and repackages it into
//! a [`Packet`] record. Neither retries: a failed send surfaces to the
//! caller, and a malformed inbound datagram is dropped — no higher layer
//! can ask the network to resend a corrupted datagram at this level.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::net::addr::{Address, Session};
use crate::net::packet::{Packet, RX_BUFFER_SIZE};
use crate::net::socket::{Socket, SocketFlags};
use crate::stack::hdr::{self, ExtractError};
use crate::stack::snip::Layer;

static SUPPRESS_TRANSMIT: AtomicBool = AtomicBool::new(false);

/// Globally suppresses actual transmission: while active, [`send`] reports
/// the full buffer length without touching the network. Instrumentation and
/// dry-run builds use this to exercise the protocol layer without traffic.
pub fn suppress_transmit(suppress: bool) {
    SUPPRESS_TRANSMIT.store(suppress, Ordering::SeqCst);
}

fn transmit_suppressed() -> bool {
    SUPPRESS_TRANSMIT.load(Ordering::SeqCst)
}

/// Send-path failure. Not retried here; retry policy, if any, belongs to
/// the protocol layer.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("send failed: {0}")]
    Io(#[from] io::Error),
}

/// Transmits `data` over `socket`.
///
/// A connected socket sends to its fixed peer and the session address is
/// ignored; otherwise the datagram is addressed to the session's peer.
///
/// # Errors
///
/// Returns the underlying I/O error, after logging it at error severity.
pub fn send(socket: &Socket, session: &Session, data: &[u8]) -> Result<usize, SendError> {
    if transmit_suppressed() {
        return Ok(data.len());
    }

    let written = if socket.flags().contains(SocketFlags::CONNECTED) {
        socket.transmit(data)
    } else {
        socket.transmit_to(data, session.remote())
    };

    written.map_err(|e| {
        error!(handle = %socket.handle(), error = %e, "network send failed");
        SendError::Io(e)
    })
}

/// Receive-path failure. The socket's readable flag is consumed on entry,
/// so a failed receive still counts as the one drain of that readiness
/// signal.
#[derive(Debug, Error)]
pub enum RecvError {
    /// The socket was not marked readable.
    #[error("socket not marked readable")]
    NotReady,
    /// Readable flag was set but no datagram was attached.
    #[error("no pending datagram attached")]
    NoPending,
    /// The attached fragment chain was malformed; the datagram is dropped.
    #[error(transparent)]
    Malformed(#[from] ExtractError),
}

/// Produces one [`Packet`] record from the datagram attached to `socket`.
///
/// Payloads beyond [`RX_BUFFER_SIZE`] are truncated to the ceiling with a
/// warning — observable, intentional data loss. A zero-length payload is a
/// valid, successful receive.
///
/// # Errors
///
/// Fails when the socket is not marked readable or the fragment chain is
/// malformed; see [`RecvError`].
pub fn receive(socket: &mut Socket) -> Result<Packet, RecvError> {
    if !socket.flags().contains(SocketFlags::CAN_READ) {
        debug!(handle = %socket.handle(), "receive: readable flag not set");
        return Err(RecvError::NotReady);
    }
    // Consume the readiness signal before touching the chain so a
    // re-entrant call cannot drain the same datagram twice.
    socket.clear_readable();

    let Some(chain) = socket.take_pending() else {
        debug!(handle = %socket.handle(), "receive: readable but no datagram attached");
        return Err(RecvError::NoPending);
    };

    let extracted = hdr::extract_udp(&chain).map_err(|e| {
        debug!(handle = %socket.handle(), error = %e, "no transport header found in datagram");
        e
    })?;
    debug!(
        src_port = %extracted.transport.src_port,
        dst_port = %extracted.transport.dst_port,
        length = extracted.transport.length,
        "transport header"
    );

    let mut len = extracted.payload_len;
    if len > RX_BUFFER_SIZE {
        warn!(
            len,
            capacity = RX_BUFFER_SIZE,
            "datagram exceeds receive buffer, truncated"
        );
        len = RX_BUFFER_SIZE;
    }

    let src = Address::from_ipv6(extracted.net.src, extracted.transport.src_port);
    let dst = Address::from_ipv6(extracted.net.dst, extracted.transport.dst_port);

    let mut packet = Packet::new(src, dst, socket.handle());
    let mut remaining = len;
    for region in chain.inner_regions(Layer::Udp) {
        if remaining == 0 {
            break;
        }
        let take = region.len().min(remaining);
        packet.append_payload(&region[..take]);
        remaining -= take;
    }

    debug!(len = packet.len(), src = %packet.src(), "received datagram");
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::socket::SocketHandle;
    use crate::stack::hdr::{Ipv6Hdr, UdpHdr, UDP_HDR_LEN};
    use crate::net::addr::WirePort;
    use crate::stack::snip::{Chain, Snip};
    use std::net::{Ipv6Addr, UdpSocket as StdUdpSocket};
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    /// Serializes tests that depend on the process-wide transmit toggle.
    fn transmit_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn inbound_chain(payload: &[u8], src_port: u16, dst_port: u16) -> Chain {
        let udp = UdpHdr {
            src_port: WirePort::from_host(src_port),
            dst_port: WirePort::from_host(dst_port),
            length: (UDP_HDR_LEN + payload.len()) as u16,
            checksum: 0,
        };
        let net = Ipv6Hdr {
            payload_len: udp.length,
            next_header: 17,
            hop_limit: 64,
            src: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
            dst: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
        };
        let mut chain = Chain::new();
        if !payload.is_empty() {
            chain.push(Snip::new(Layer::Payload, payload.to_vec()));
        }
        chain.push(Snip::new(Layer::Udp, udp.encode().to_vec()));
        chain.push(Snip::new(Layer::Ipv6, net.encode().to_vec()));
        chain
    }

    fn readable_socket(payload: &[u8], dst_port: u16) -> Socket {
        let mut sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        sock.mark_readable(inbound_chain(payload, 40000, dst_port));
        sock
    }

    #[test]
    fn send_unconnected_addresses_the_session_peer() {
        let _guard = transmit_lock().lock().unwrap();
        let receiver = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let peer = Address::from(receiver.local_addr().unwrap());

        let sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        let session = Session::new(peer);
        let sent = send(&sock, &session, b"datagram").unwrap();
        assert_eq!(sent, 8);

        let mut buf = [0u8; 64];
        let (n, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"datagram");
        assert_eq!(Address::from(from), sock.local_addr().unwrap());
    }

    #[test]
    fn send_connected_ignores_session_address() {
        let _guard = transmit_lock().lock().unwrap();
        let receiver = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let decoy = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        decoy
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let mut sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        sock.connect(Address::from(receiver.local_addr().unwrap()))
            .unwrap();

        // The session points somewhere else entirely.
        let session = Session::new(Address::from(decoy.local_addr().unwrap()));
        let sent = send(&sock, &session, b"hello").unwrap();
        assert_eq!(sent, 5);

        let mut buf = [0u8; 64];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert!(decoy.recv_from(&mut buf).is_err());
    }

    #[test]
    fn suppressed_send_reports_full_length_without_traffic() {
        let _guard = transmit_lock().lock().unwrap();
        let receiver = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        let session = Session::new(Address::from(receiver.local_addr().unwrap()));

        suppress_transmit(true);
        let result = send(&sock, &session, b"invisible");
        suppress_transmit(false);

        assert_eq!(result.unwrap(), 9);
        let mut buf = [0u8; 64];
        assert!(receiver.recv_from(&mut buf).is_err());
    }

    #[test]
    fn receive_produces_record() {
        let mut sock = readable_socket(b"hello", 5683);
        let packet = receive(&mut sock).unwrap();
        assert_eq!(packet.len(), 5);
        assert_eq!(packet.payload(), b"hello");
        assert_eq!(packet.dst().port(), 5683);
        assert_eq!(packet.src().port(), 40000);
        assert_eq!(packet.iface(), SocketHandle::new(1));
        // Both addresses come out in the normalized IPv6 form.
        assert!(packet.src().as_socket_addr().is_ipv6());
        assert!(packet.dst().as_socket_addr().is_ipv6());
    }

    #[test]
    fn receive_without_readable_flag_fails_without_side_effects() {
        let mut sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        assert!(matches!(receive(&mut sock), Err(RecvError::NotReady)));
        assert_eq!(sock.flags(), SocketFlags::empty());
    }

    #[test]
    fn readiness_is_drained_by_exactly_one_receive() {
        let mut sock = readable_socket(b"one", 5683);
        assert!(receive(&mut sock).is_ok());
        assert!(matches!(receive(&mut sock), Err(RecvError::NotReady)));
    }

    #[test]
    fn malformed_chain_is_a_fault_and_still_drains_readiness() {
        let mut sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        let mut chain = Chain::new();
        chain.push(Snip::new(Layer::Payload, b"junk".to_vec()));
        sock.mark_readable(chain);

        assert!(matches!(receive(&mut sock), Err(RecvError::Malformed(_))));
        assert!(!sock.flags().contains(SocketFlags::CAN_READ));
        assert!(matches!(receive(&mut sock), Err(RecvError::NotReady)));
    }

    #[test]
    fn truncated_transport_header_is_a_fault() {
        let mut sock = Socket::bind(SocketHandle::new(1), Address::localhost(0)).unwrap();
        let mut chain = Chain::new();
        chain.push(Snip::new(Layer::Udp, vec![0x16, 0x33, 0x01]));
        chain.push(Snip::new(
            Layer::Ipv6,
            Ipv6Hdr {
                payload_len: 0,
                next_header: 17,
                hop_limit: 64,
                src: Ipv6Addr::LOCALHOST,
                dst: Ipv6Addr::LOCALHOST,
            }
            .encode()
            .to_vec(),
        ));
        sock.mark_readable(chain);
        assert!(matches!(receive(&mut sock), Err(RecvError::Malformed(_))));
    }

    #[test]
    fn oversized_payload_truncates_to_capacity() {
        let big = vec![0x42u8; RX_BUFFER_SIZE + 128];
        let mut sock = readable_socket(&big, 5683);
        let packet = receive(&mut sock).unwrap();
        assert_eq!(packet.len(), RX_BUFFER_SIZE);
        assert!(packet.payload().iter().all(|&b| b == 0x42));
    }

    #[test]
    fn empty_payload_is_a_valid_receive() {
        let mut sock = readable_socket(b"", 5683);
        let packet = receive(&mut sock).unwrap();
        assert!(packet.is_empty());
        assert_eq!(packet.dst().port(), 5683);
    }
}
