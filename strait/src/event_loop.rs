//! One iteration of the event loop: gather, wait, dispatch, drive.
//!
//! [`run_once`] reconciles two worlds. The underlying stack hands over one
//! inbound datagram at a time, addressed to whichever of the bound local
//! ports it was sent to; the protocol library expects to poll many sockets
//! under a deadline. Each pass gathers the library's watch set, blocks for
//! at most one notification within the clamped deadline, routes an arrived
//! datagram to the one socket bound to its destination port, and then
//! drives the library's read entry point unconditionally.

use std::time::Duration;

use minstant::Instant;
use tracing::{debug, trace};

use crate::net::socket::SocketFlags;
use crate::proto::{Protocol, WatchSet};
use crate::stack::event::{EventQueue, Notification};
use crate::stack::snip::Chain;

/// Runs one event-loop pass and returns the elapsed wall time in
/// milliseconds.
///
/// The wait is bounded by `min(library timer, timeout_ms)`, where a library
/// timer of 0 means "no ready timer" and the caller's bound alone governs.
/// At most one stack notification is consumed; callers drain backlog by
/// invoking the loop again.
///
/// Dispatch is first-match-wins: when several endpoints share a bound port,
/// only the first one found is ever woken. That is a known limitation of
/// the port demultiplex, kept as-is.
pub fn run_once<P: Protocol>(protocol: &mut P, queue: &EventQueue, timeout_ms: u64) -> u64 {
    let before = Instant::now();

    let mut watch = WatchSet::new();
    let proto_timeout = protocol.write(&mut watch, before);

    let wait_ms = if proto_timeout == 0 || timeout_ms < proto_timeout {
        timeout_ms
    } else {
        proto_timeout
    };

    // Inbound interest is scoped to this pass: acquired only when some
    // watched socket wants reading, released exactly once below.
    let registration = if watch.wants_read() {
        Some(queue.register())
    } else {
        None
    };

    if let Some(notification) = queue.pop_timeout(Duration::from_millis(wait_ms)) {
        match notification {
            Notification::Receive(chain) => dispatch(protocol, &watch, chain),
            // These exist in the notification protocol but carry no work
            // for this layer.
            Notification::Send | Notification::Set | Notification::Get => {}
        }
    }

    let now = Instant::now();
    protocol.read(now);

    drop(registration);
    before.elapsed().as_millis() as u64
}

/// Routes one inbound datagram to the socket bound to its destination port.
fn dispatch<P: Protocol>(protocol: &mut P, watch: &WatchSet, chain: Chain) {
    let transport = match chain.udp_header() {
        Ok(hdr) => hdr,
        Err(e) => {
            debug!(error = %e, "inbound datagram without transport header");
            return;
        }
    };
    let dst_port = transport.dst_port;

    for endpoint in protocol.endpoints_mut() {
        if endpoint.bind_addr().wire_port() != dst_port {
            continue;
        }
        let handle = endpoint.socket().handle();
        let watched = watch
            .get(handle)
            .is_some_and(|entry| entry.wants.contains(SocketFlags::WANT_READ));
        if watched {
            debug!(handle = %handle, port = %dst_port, "socket can read");
            endpoint.socket_mut().mark_readable(chain);
            return;
        }
    }

    // No socket claimed the datagram; dropping the chain here releases it.
    trace!(port = %dst_port, "no endpoint bound for inbound datagram, dropping");
}
