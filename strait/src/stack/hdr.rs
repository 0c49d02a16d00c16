//! Transport and network header parsing for inbound fragment chains.
//!
//! ## Wire layout
//!
//! Multi-byte header fields are big-endian on the wire. Port fields are
//! kept in wire order as [`WirePort`]; length and checksum fields are
//! converted to host order when parsed.
//!
//! | Header | Layout |
//! |--------|--------|
//! | UDP    | `[src_port:2][dst_port:2][length:2][checksum:2]` |
//! | IPv6   | `[ver/tc:1][tc/flow:3][payload_len:2][next_hdr:1][hop_limit:1][src:16][dst:16]` |

use std::net::Ipv6Addr;

use thiserror::Error;

use crate::net::addr::WirePort;

use super::snip::{Chain, Layer};

/// Size of the fixed UDP header.
pub const UDP_HDR_LEN: usize = 8;

/// Size of the fixed IPv6 header.
pub const IPV6_HDR_LEN: usize = 40;

/// Errors decoding a single header region.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The region ends before the field being read.
    #[error("header region truncated: {have} of {need} bytes")]
    Truncated { need: usize, have: usize },
    /// The network header does not carry the supported IP version.
    #[error("unsupported IP version {0}")]
    Version(u8),
}

/// Bounds-checked cursor over one header region.
struct HeaderReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> HeaderReader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], HeaderError> {
        let end = self.cursor + len;
        if end > self.buf.len() {
            return Err(HeaderError::Truncated {
                need: end,
                have: self.buf.len(),
            });
        }
        let slice = &self.buf[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, HeaderError> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, HeaderError> {
        let mut arr = [0u8; 2];
        arr.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(arr))
    }

    fn take_wire_port(&mut self) -> Result<WirePort, HeaderError> {
        let mut arr = [0u8; 2];
        arr.copy_from_slice(self.take(2)?);
        Ok(WirePort::from_wire(arr))
    }
}

/// Parsed UDP header. Ports stay in wire order.
#[derive(Debug, Clone, Copy)]
pub struct UdpHdr {
    pub src_port: WirePort,
    pub dst_port: WirePort,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHdr {
    /// Decodes the fixed UDP header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Truncated`] when `buf` is shorter than
    /// [`UDP_HDR_LEN`].
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        let mut r = HeaderReader::new(buf);
        Ok(Self {
            src_port: r.take_wire_port()?,
            dst_port: r.take_wire_port()?,
            length: r.take_u16()?,
            checksum: r.take_u16()?,
        })
    }

    /// Encodes the header into its wire form. Used by in-process drivers
    /// that synthesize inbound chains.
    #[must_use]
    pub fn encode(&self) -> [u8; UDP_HDR_LEN] {
        let mut buf = [0u8; UDP_HDR_LEN];
        buf[0..2].copy_from_slice(&self.src_port.wire_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.wire_bytes());
        buf[4..6].copy_from_slice(&self.length.to_be_bytes());
        buf[6..8].copy_from_slice(&self.checksum.to_be_bytes());
        buf
    }
}

/// Parsed fixed IPv6 header.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Hdr {
    pub payload_len: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
}

impl Ipv6Hdr {
    /// Decodes the fixed IPv6 header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Truncated`] on a short region and
    /// [`HeaderError::Version`] when the version nibble is not 6.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        let mut r = HeaderReader::new(buf);
        let ver_tc = r.take_u8()?;
        let version = ver_tc >> 4;
        if version != 6 {
            return Err(HeaderError::Version(version));
        }
        // Remainder of traffic class + flow label.
        r.take(3)?;
        let payload_len = r.take_u16()?;
        let next_header = r.take_u8()?;
        let hop_limit = r.take_u8()?;
        let mut src = [0u8; 16];
        src.copy_from_slice(r.take(16)?);
        let mut dst = [0u8; 16];
        dst.copy_from_slice(r.take(16)?);
        Ok(Self {
            payload_len,
            next_header,
            hop_limit,
            src: Ipv6Addr::from(src),
            dst: Ipv6Addr::from(dst),
        })
    }

    /// Encodes the fixed header into its wire form, with traffic class and
    /// flow label zeroed. Used by in-process drivers that synthesize
    /// inbound chains.
    #[must_use]
    pub fn encode(&self) -> [u8; IPV6_HDR_LEN] {
        let mut buf = [0u8; IPV6_HDR_LEN];
        buf[0] = 6 << 4;
        buf[4..6].copy_from_slice(&self.payload_len.to_be_bytes());
        buf[6] = self.next_header;
        buf[7] = self.hop_limit;
        buf[8..24].copy_from_slice(&self.src.octets());
        buf[24..40].copy_from_slice(&self.dst.octets());
        buf
    }
}

/// Failure to locate or decode the layered headers of a fragment chain.
///
/// A chain that fails extraction is malformed; the datagram is dropped and
/// higher layers never see it.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No network-layer header snip in the chain.
    #[error("no network header in fragment chain")]
    MissingNetwork,
    /// No transport-layer snip in the chain.
    #[error("no transport fragment in chain")]
    MissingTransport,
    /// A header region was present but undecodable.
    #[error("malformed header: {0}")]
    Header(#[from] HeaderError),
}

impl Chain {
    /// Stack accessor for the network-layer header of this chain.
    ///
    /// # Errors
    ///
    /// Fails when the chain carries no network snip or the snip is
    /// undecodable.
    pub fn ipv6_header(&self) -> Result<Ipv6Hdr, ExtractError> {
        let snip = self.search(Layer::Ipv6).ok_or(ExtractError::MissingNetwork)?;
        Ok(Ipv6Hdr::parse(snip.bytes())?)
    }

    /// Lightweight peek at the transport header, used by dispatch to read
    /// the destination port without consuming the chain.
    ///
    /// # Errors
    ///
    /// Fails when the chain carries no transport snip or its header region
    /// is truncated.
    pub fn udp_header(&self) -> Result<UdpHdr, ExtractError> {
        let snip = self.search(Layer::Udp).ok_or(ExtractError::MissingTransport)?;
        Ok(UdpHdr::parse(snip.bytes())?)
    }
}

/// The decoded headers of one inbound datagram plus its payload length.
#[derive(Debug)]
pub struct Extracted {
    pub net: Ipv6Hdr,
    pub transport: UdpHdr,
    /// Chain length up to the transport boundary, minus the transport
    /// header itself.
    pub payload_len: usize,
}

/// Locates and decodes the network and transport headers of `chain`.
///
/// # Errors
///
/// Fails when either header is absent or undecodable; the chain is then
/// considered malformed and the read is aborted.
pub fn extract_udp(chain: &Chain) -> Result<Extracted, ExtractError> {
    let net = chain.ipv6_header()?;
    let transport = chain.udp_header()?;
    let upto = chain
        .len_upto(Layer::Udp)
        .ok_or(ExtractError::MissingTransport)?;
    Ok(Extracted {
        net,
        transport,
        payload_len: upto.saturating_sub(UDP_HDR_LEN),
    })
}
