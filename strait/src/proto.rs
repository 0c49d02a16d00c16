//! The boundary to the protocol library core.
//!
//! The protocol library owns PDU parsing, retransmission bookkeeping, and
//! the sockets themselves; this layer only needs its two entry points and
//! its endpoint collection. [`Protocol`] is that seam — backend-agnostic,
//! so a scripted core can stand in for the real library in tests.

use minstant::Instant;
use thiserror::Error;

use crate::net::socket::{Endpoint, SocketFlags, SocketHandle};

/// Upper bound on the sockets one event-loop pass will watch.
pub const MAX_WATCHED_SOCKETS: usize = 16;

/// One watched socket: its handle and the interest flags it was gathered
/// with.
#[derive(Debug, Clone, Copy)]
pub struct WatchEntry {
    pub handle: SocketHandle,
    pub wants: SocketFlags,
}

/// The watch set is at capacity.
#[derive(Debug, Error)]
#[error("watch set full ({MAX_WATCHED_SOCKETS} sockets)")]
pub struct WatchSetFull;

/// The bounded set of sockets gathered for one event-loop pass.
#[derive(Debug, Default)]
pub struct WatchSet {
    entries: Vec<WatchEntry>,
}

impl WatchSet {
    /// Creates an empty watch set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a socket with its interest flags.
    ///
    /// # Errors
    ///
    /// Fails once [`MAX_WATCHED_SOCKETS`] entries are held.
    pub fn push(&mut self, handle: SocketHandle, wants: SocketFlags) -> Result<(), WatchSetFull> {
        if self.entries.len() >= MAX_WATCHED_SOCKETS {
            return Err(WatchSetFull);
        }
        self.entries.push(WatchEntry { handle, wants });
        Ok(())
    }

    /// Looks up the entry for a handle.
    #[must_use]
    pub fn get(&self, handle: SocketHandle) -> Option<&WatchEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    /// `true` when any watched socket asked for inbound data.
    #[must_use]
    pub fn wants_read(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.wants.contains(SocketFlags::WANT_READ))
    }

    /// Number of watched sockets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the gathered entries.
    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.iter()
    }
}

/// The protocol library core as seen from the event loop.
pub trait Protocol {
    /// Flushes pending outbound traffic, fills `watch` with the sockets to
    /// observe this pass, and returns the earliest protocol timer deadline
    /// in milliseconds — `0` when no timer is pending.
    fn write(&mut self, watch: &mut WatchSet, now: Instant) -> u64;

    /// Drains every socket currently marked readable through the receive
    /// path.
    fn read(&mut self, now: Instant);

    /// The unordered collection of bound endpoints.
    fn endpoints_mut(&mut self) -> &mut [Endpoint];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_set_is_bounded() {
        let mut watch = WatchSet::new();
        for i in 0..MAX_WATCHED_SOCKETS {
            watch
                .push(SocketHandle::new(i as u32), SocketFlags::WANT_READ)
                .unwrap();
        }
        assert!(watch
            .push(SocketHandle::new(99), SocketFlags::WANT_READ)
            .is_err());
        assert_eq!(watch.len(), MAX_WATCHED_SOCKETS);
    }

    #[test]
    fn wants_read_checks_flags_not_presence() {
        let mut watch = WatchSet::new();
        watch
            .push(SocketHandle::new(1), SocketFlags::WANT_WRITE)
            .unwrap();
        assert!(!watch.wants_read());
        watch
            .push(SocketHandle::new(2), SocketFlags::WANT_READ)
            .unwrap();
        assert!(watch.wants_read());
    }

    #[test]
    fn get_finds_by_handle() {
        let mut watch = WatchSet::new();
        watch
            .push(SocketHandle::new(5), SocketFlags::WANT_READ)
            .unwrap();
        assert!(watch.get(SocketHandle::new(5)).is_some());
        assert!(watch.get(SocketHandle::new(6)).is_none());
    }
}
