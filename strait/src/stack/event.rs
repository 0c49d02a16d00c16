//! Stack notifications, the bounded notification mailbox, and scoped
//! registration of inbound interest.
//!
//! The underlying stack delivers work to this layer as asynchronous
//! notifications. The mailbox is an owned, fixed-capacity queue created at
//! process startup and passed to the event loop — delivery never blocks the
//! stack, and the event loop drains at most one notification per pass.
//!
//! Inbound datagrams are only routed here while a [`Registration`] is
//! alive. Interest is refcounted, so nested registrations compose and each
//! guard releases exactly the acquisition it made.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::snip::Chain;

/// Default capacity of the notification mailbox.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// One asynchronous event delivered by the underlying stack.
///
/// Only `Receive` carries work for this layer; the other variants exist in
/// the notification protocol and are ignored by the event loop.
#[derive(Debug)]
pub enum Notification {
    /// An inbound datagram with its fragment chain. Ownership of the chain
    /// passes to whichever socket claims it.
    Receive(Chain),
    /// Send completion.
    Send,
    /// Configuration set acknowledgment.
    Set,
    /// Configuration get response.
    Get,
}

/// Why the mailbox refused a notification. The notification is handed back
/// to the caller for disposal in every case.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// A `Receive` was offered while no inbound registration is active; the
    /// stack keeps ownership of the chain.
    #[error("no inbound registration active")]
    NotRegistered(Notification),
    /// Mailbox at capacity.
    #[error("notification queue full")]
    QueueFull(Notification),
    /// The consuming side of the mailbox is gone.
    #[error("notification queue closed")]
    Closed(Notification),
}

/// Process startup ran more than once.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("process startup already ran")]
    AlreadyStarted,
}

static STARTED: AtomicBool = AtomicBool::new(false);

/// One-time process initialization: builds the notification mailbox with
/// the default capacity.
///
/// Must run once, at process or task startup, before the first event-loop
/// call. The mailbox is returned as an owned resource for the caller to
/// thread through the event loop.
///
/// # Errors
///
/// Fails with [`StartupError::AlreadyStarted`] on any call after the first.
pub fn startup() -> Result<EventQueue, StartupError> {
    if STARTED.swap(true, Ordering::SeqCst) {
        return Err(StartupError::AlreadyStarted);
    }
    Ok(EventQueue::with_capacity(EVENT_QUEUE_CAPACITY))
}

/// The owned, fixed-capacity notification mailbox.
pub struct EventQueue {
    rx: Receiver<Notification>,
    tx: SyncSender<Notification>,
    interest: Arc<AtomicUsize>,
}

impl EventQueue {
    /// Creates a mailbox with an explicit capacity.
    ///
    /// Embedders that manage process lifecycle themselves may use this
    /// directly instead of [`startup`].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "mailbox capacity must be greater than 0");
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self {
            rx,
            tx,
            interest: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the producer handle the stack/driver side uses to deliver
    /// notifications.
    #[must_use]
    pub fn handle(&self) -> StackHandle {
        StackHandle {
            tx: self.tx.clone(),
            interest: Arc::clone(&self.interest),
        }
    }

    /// Registers interest in inbound traffic for the datagram transport
    /// this layer supports. Interest lasts until the guard drops.
    #[must_use]
    pub fn register(&self) -> Registration {
        self.interest.fetch_add(1, Ordering::SeqCst);
        Registration {
            interest: Arc::clone(&self.interest),
        }
    }

    /// Blocks for at most `timeout` waiting for a single notification.
    ///
    /// Returns `None` when the wait elapses with nothing delivered. At most
    /// one notification is drained — backlog stays queued for later passes.
    #[must_use]
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Notification> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Cloneable producer side of the mailbox, held by the stack/driver.
#[derive(Clone)]
pub struct StackHandle {
    tx: SyncSender<Notification>,
    interest: Arc<AtomicUsize>,
}

impl StackHandle {
    /// Offers a notification to the mailbox without blocking.
    ///
    /// `Receive` notifications are refused while no registration is active
    /// (the stack would not have routed the datagram to this task). The
    /// other variants are delivered regardless of registration.
    ///
    /// # Errors
    ///
    /// See [`DeliverError`]; the notification is returned inside the error.
    pub fn deliver(&self, notification: Notification) -> Result<(), DeliverError> {
        if matches!(notification, Notification::Receive(_))
            && self.interest.load(Ordering::SeqCst) == 0
        {
            return Err(DeliverError::NotRegistered(notification));
        }
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(n) => DeliverError::QueueFull(n),
            TrySendError::Disconnected(n) => DeliverError::Closed(n),
        })
    }
}

/// Scoped inbound-interest registration. Dropping the guard releases the
/// one acquisition it represents.
#[derive(Debug)]
pub struct Registration {
    interest: Arc<AtomicUsize>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.interest.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::snip::{Layer, Snip};
    use std::time::Instant;

    fn receive_notification() -> Notification {
        let mut chain = Chain::new();
        chain.push(Snip::new(Layer::Payload, b"x".to_vec()));
        Notification::Receive(chain)
    }

    #[test]
    fn receive_refused_without_registration() {
        let queue = EventQueue::with_capacity(4);
        let handle = queue.handle();
        match handle.deliver(receive_notification()) {
            Err(DeliverError::NotRegistered(Notification::Receive(chain))) => {
                // The chain comes back to the caller intact.
                assert_eq!(chain.total_len(), 1);
            }
            other => panic!("expected NotRegistered, got {other:?}"),
        }
    }

    #[test]
    fn receive_accepted_while_registered() {
        let queue = EventQueue::with_capacity(4);
        let handle = queue.handle();
        let reg = queue.register();
        handle.deliver(receive_notification()).unwrap();
        assert!(matches!(
            queue.pop_timeout(Duration::from_millis(10)),
            Some(Notification::Receive(_))
        ));
        drop(reg);
        assert!(matches!(
            handle.deliver(receive_notification()),
            Err(DeliverError::NotRegistered(_))
        ));
    }

    #[test]
    fn nested_registrations_compose() {
        let queue = EventQueue::with_capacity(4);
        let handle = queue.handle();
        let outer = queue.register();
        let inner = queue.register();
        drop(inner);
        // The outer registration still holds interest.
        handle.deliver(receive_notification()).unwrap();
        drop(outer);
        assert!(matches!(
            handle.deliver(receive_notification()),
            Err(DeliverError::NotRegistered(_))
        ));
    }

    #[test]
    fn non_receive_bypasses_registration() {
        let queue = EventQueue::with_capacity(4);
        queue.handle().deliver(Notification::Send).unwrap();
        assert!(matches!(
            queue.pop_timeout(Duration::from_millis(10)),
            Some(Notification::Send)
        ));
    }

    #[test]
    fn queue_full_hands_notification_back() {
        let queue = EventQueue::with_capacity(1);
        let handle = queue.handle();
        handle.deliver(Notification::Send).unwrap();
        assert!(matches!(
            handle.deliver(Notification::Set),
            Err(DeliverError::QueueFull(Notification::Set))
        ));
    }

    #[test]
    fn pop_timeout_elapses_empty() {
        let queue = EventQueue::with_capacity(4);
        let before = Instant::now();
        assert!(queue.pop_timeout(Duration::from_millis(50)).is_none());
        assert!(before.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn startup_fails_loudly_on_second_call() {
        let first = startup();
        let second = startup();
        // Regardless of which call this test process saw first, exactly one
        // startup may ever succeed.
        assert!(first.is_ok());
        assert!(matches!(second, Err(StartupError::AlreadyStarted)));
    }
}
