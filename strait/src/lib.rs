//! Datagram I/O adaptation layer between a message-passing network stack
//! and a connectionless request/response protocol library.
//!
//! The underlying stack delivers inbound packets as typed fragment chains,
//! one asynchronous notification at a time, across *all* local listeners.
//! The protocol library on top expects a socket abstraction it can poll:
//! many bound endpoints, per-socket readiness flags, and a bounded wait
//! with a real-time deadline. This crate bridges the two:
//!
//! - [`send`] transmits an opaque buffer to a peer, choosing connected or
//!   addressed sends.
//! - [`receive`] consumes the fragment chain attached to a readable socket
//!   and repackages it into a uniform [`Packet`] record with resolved
//!   source and destination addresses.
//! - [`run_once`] runs one event-loop pass: gather the protocol library's
//!   watch set, wait for a single stack notification under the clamped
//!   deadline, demultiplex it by destination port onto the matching bound
//!   endpoint, and drive the library's read cycle.
//! - [`startup`] performs the one-time process initialization that builds
//!   the notification mailbox.
//!
//! PDU parsing, retransmission, resources, and security are owned by the
//! protocol library behind the [`proto::Protocol`] trait; this layer never
//! looks inside payload bytes.

pub mod event_loop;
pub mod io;
pub mod net;
pub mod proto;
pub mod stack;

pub use event_loop::run_once;
pub use io::{receive, send, suppress_transmit, RecvError, SendError};
pub use net::{
    Address, Endpoint, Packet, Session, Socket, SocketFlags, SocketHandle, WirePort,
    RX_BUFFER_SIZE,
};
pub use proto::{Protocol, WatchSet, MAX_WATCHED_SOCKETS};
pub use stack::{startup, Chain, EventQueue, Notification, StackHandle};

// Re-export the tick type used across the protocol boundary.
pub use minstant::Instant;
