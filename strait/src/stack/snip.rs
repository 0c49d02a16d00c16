//! Fragment chains: the typed memory regions making up one received
//! datagram.
//!
//! The underlying stack delivers an inbound packet as a chain of typed
//! snips, ordered innermost-first:
//!
//! ```text
//! [payload] -> [transport hdr] -> [network hdr] -> [link]
//! ```
//!
//! # Ownership
//!
//! [`Chain`] is **move-only** — it deliberately does not implement `Clone`.
//! Whoever holds the chain releases its buffers on drop; attaching a chain
//! to a socket moves it, so a datagram can never be claimed twice.

/// Protocol layer of one snip, mirroring the stack's snip type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Untyped application payload.
    Payload,
    /// Transport (UDP) header region.
    Udp,
    /// Network (IPv6) header region.
    Ipv6,
    /// Link-layer / interface region.
    Netif,
}

/// One typed memory region of a received datagram.
#[derive(Debug)]
pub struct Snip {
    layer: Layer,
    data: Vec<u8>,
}

impl Snip {
    /// Creates a snip of the given layer over owned bytes.
    #[must_use]
    pub fn new(layer: Layer, data: Vec<u8>) -> Self {
        Self { layer, data }
    }

    /// Returns the layer tag.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Returns the region bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the region length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A received datagram as a sequence of typed snips, innermost-first.
#[derive(Debug, Default)]
pub struct Chain {
    snips: Vec<Snip>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snip one layer outward of the current outermost snip.
    ///
    /// Building an inbound datagram therefore reads inside-out: payload
    /// first, then the transport header, then the network header.
    pub fn push(&mut self, snip: Snip) {
        self.snips.push(snip);
    }

    /// Returns the first snip of the given layer, searching innermost-first.
    #[must_use]
    pub fn search(&self, layer: Layer) -> Option<&Snip> {
        self.snips.iter().find(|s| s.layer() == layer)
    }

    /// Total bytes of all snips up to and including the first snip of the
    /// given layer, or `None` when the chain has no such snip.
    #[must_use]
    pub fn len_upto(&self, layer: Layer) -> Option<usize> {
        let mut total = 0;
        for snip in &self.snips {
            total += snip.len();
            if snip.layer() == layer {
                return Some(total);
            }
        }
        None
    }

    /// Total bytes across the whole chain.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.snips.iter().map(Snip::len).sum()
    }

    /// The regions inner to the first snip of the given layer, in chain
    /// order. For an inbound datagram this is the payload carried below the
    /// transport header.
    pub fn inner_regions(&self, layer: Layer) -> impl Iterator<Item = &[u8]> {
        self.snips
            .iter()
            .take_while(move |s| s.layer() != layer)
            .map(Snip::bytes)
    }

    /// Number of snips in the chain.
    #[must_use]
    pub fn snip_count(&self) -> usize {
        self.snips.len()
    }
}
