// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ICMP packet implementation
//!
//! Only the parts of RFC 792 a pinger needs: building Echo Requests and
//! decoding Echo Replies, Time Exceeded and Destination Unreachable.

use crate::checksum::checksum;
use crate::error::PingError;
use crate::ip::Ipv4Header;
use std::fmt;

pub const ICMP_HEADER_LEN: usize = 8;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

// Time Exceeded codes
pub const ICMP_TTL_EXPIRED: u8 = 0;
pub const ICMP_FRAGMENT_REASSEMBLY_EXPIRED: u8 = 1;

// Destination Unreachable codes
pub const ICMP_NET_UNREACHABLE: u8 = 0;
pub const ICMP_HOST_UNREACHABLE: u8 = 1;

pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
const PAYLOAD_FILLER: u8 = b'Q';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub icmp_cksum: u16,
    pub icmp_id: u16,
    pub icmp_seq: u16,
}

impl IcmpHeader {
    /// Decode the first 8 bytes of `data`. Identifier and sequence are only
    /// meaningful for echo messages; for errors they hold the unused word.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return None;
        }

        Some(Self {
            icmp_type: data[0],
            icmp_code: data[1],
            icmp_cksum: u16::from_be_bytes([data[2], data[3]]),
            icmp_id: u16::from_be_bytes([data[4], data[5]]),
            icmp_seq: u16::from_be_bytes([data[6], data[7]]),
        })
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.icmp_type);
        buf.push(self.icmp_code);
        buf.extend_from_slice(&self.icmp_cksum.to_be_bytes());
        buf.extend_from_slice(&self.icmp_id.to_be_bytes());
        buf.extend_from_slice(&self.icmp_seq.to_be_bytes());
    }

    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == ICMP_ECHO_REPLY
    }

    pub fn is_error(&self) -> bool {
        matches!(self.icmp_type, ICMP_DEST_UNREACHABLE | ICMP_TIME_EXCEEDED)
    }

    pub fn matches(&self, id: u16, seq: u16) -> bool {
        self.icmp_id == id && self.icmp_seq == seq
    }
}

impl fmt::Display for IcmpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} code={} checksum={:#06x} id={} seq={}",
            self.icmp_type, self.icmp_code, self.icmp_cksum, self.icmp_id, self.icmp_seq
        )
    }
}

/// An outgoing ICMP message: header plus payload.
#[derive(Debug, Clone)]
pub struct IcmpPacket {
    pub header: IcmpHeader,
    pub payload: Vec<u8>,
}

impl IcmpPacket {
    pub fn new_echo_request(id: u16, seq: u16, payload: &[u8]) -> Self {
        let header = IcmpHeader {
            icmp_type: ICMP_ECHO_REQUEST,
            icmp_code: 0,
            icmp_cksum: 0,
            icmp_id: id,
            icmp_seq: seq,
        };

        let mut packet = Self {
            header,
            payload: payload.to_vec(),
        };

        packet.header.icmp_cksum = packet.compute_checksum();
        packet
    }

    /// Echo request whose payload is `size` filler bytes.
    pub fn echo_request(id: u16, seq: u16, size: usize) -> Self {
        Self::new_echo_request(id, seq, &vec![PAYLOAD_FILLER; size])
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ICMP_HEADER_LEN + self.payload.len());
        self.header.write_to(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf
    }

    fn compute_checksum(&self) -> u16 {
        let zeroed = IcmpHeader { icmp_cksum: 0, ..self.header };
        let mut buf = Vec::with_capacity(ICMP_HEADER_LEN + self.payload.len());
        zeroed.write_to(&mut buf);
        buf.extend_from_slice(&self.payload);
        checksum(&buf)
    }

    pub fn is_valid(&self) -> bool {
        self.compute_checksum() == self.header.icmp_cksum
    }
}

/// Build the wire bytes of an Echo Request: 8-byte header followed by
/// `payload_size` filler bytes.
pub fn build_echo_request(id: u16, seq: u16, payload_size: usize) -> Vec<u8> {
    IcmpPacket::echo_request(id, seq, payload_size).to_bytes()
}

/// Headers of the datagram that triggered an ICMP error, as quoted back in
/// the error's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub ip_header: Ipv4Header,
    pub icmp_header: IcmpHeader,
}

/// A decoded inbound ICMP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedIcmp {
    pub header: IcmpHeader,
    /// Present for Time Exceeded and Destination Unreachable when the quoted
    /// original is complete.
    pub origin: Option<Origin>,
}

impl ReceivedIcmp {
    /// Identifier and sequence that tie this message to a request: the echo
    /// fields for replies, the quoted request's fields for errors.
    pub fn correlation(&self) -> Option<(u16, u16)> {
        if self.header.is_error() {
            self.origin
                .filter(|o| o.icmp_header.icmp_type == ICMP_ECHO_REQUEST)
                .map(|o| (o.icmp_header.icmp_id, o.icmp_header.icmp_seq))
        } else {
            Some((self.header.icmp_id, self.header.icmp_seq))
        }
    }
}

/// Parse the ICMP message that starts `ip_header_len` bytes into `data`.
pub fn parse_icmp_header(data: &[u8], ip_header_len: usize) -> Result<ReceivedIcmp, PingError> {
    let icmp = data
        .get(ip_header_len..)
        .ok_or(PingError::MalformedPacket("ICMP header missing"))?;
    let header = IcmpHeader::from_bytes(icmp)
        .ok_or(PingError::MalformedPacket("ICMP header truncated"))?;

    let origin = if header.is_error() {
        parse_origin(&icmp[ICMP_HEADER_LEN..])
    } else {
        None
    };

    Ok(ReceivedIcmp { header, origin })
}

fn parse_origin(quoted: &[u8]) -> Option<Origin> {
    let ip_header = Ipv4Header::from_bytes(quoted).ok()?;
    let icmp_header = IcmpHeader::from_bytes(quoted.get(ip_header.header_len..)?)?;
    Some(Origin { ip_header, icmp_header })
}
