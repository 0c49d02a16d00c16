//! The underlying stack's view of the world: fragment chains, header
//! regions, and asynchronous notifications.

pub mod event;
pub mod hdr;
pub mod snip;

pub use event::{
    startup, DeliverError, EventQueue, Notification, Registration, StackHandle, StartupError,
    EVENT_QUEUE_CAPACITY,
};
pub use hdr::{
    extract_udp, ExtractError, Extracted, HeaderError, Ipv6Hdr, UdpHdr, IPV6_HDR_LEN, UDP_HDR_LEN,
};
pub use snip::{Chain, Layer, Snip};
