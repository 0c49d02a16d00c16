//! Addressing, sockets, and the packet record.

pub mod addr;
pub mod packet;
pub mod socket;

pub use addr::{Address, Session, WirePort};
pub use packet::{Packet, RX_BUFFER_SIZE};
pub use socket::{Endpoint, Socket, SocketFlags, SocketHandle};
