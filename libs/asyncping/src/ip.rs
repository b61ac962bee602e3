// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! IPv4 header view
//!
//! Raw ICMP sockets on Linux deliver every datagram with its IPv4 header
//! still attached. The view below decodes the fixed 20-byte part; options,
//! when present, are skipped using the IHL field.

use crate::error::PingError;
use std::fmt;
use std::net::Ipv4Addr;

pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPPROTO_ICMP: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    /// Header length in bytes (IHL * 4).
    pub header_len: usize,
    pub tos: u8,
    pub total_len: u16,
    pub identification: u16,
    /// Flags and fragment offset, as the raw 16-bit word.
    pub flags: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    pub fn from_bytes(data: &[u8]) -> Result<Self, PingError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(PingError::MalformedPacket("IPv4 header truncated"));
        }

        let version = data[0] >> 4;
        if version != 4 {
            return Err(PingError::MalformedPacket("not an IPv4 header"));
        }

        let header_len = ((data[0] & 0x0F) as usize) * 4;
        if header_len < IPV4_MIN_HEADER_LEN {
            return Err(PingError::MalformedPacket("IPv4 header length below minimum"));
        }
        if data.len() < header_len {
            return Err(PingError::MalformedPacket("IPv4 options truncated"));
        }

        Ok(Self {
            version,
            header_len,
            tos: data[1],
            total_len: u16::from_be_bytes([data[2], data[3]]),
            identification: u16::from_be_bytes([data[4], data[5]]),
            flags: u16::from_be_bytes([data[6], data[7]]),
            ttl: data[8],
            protocol: data[9],
            checksum: u16::from_be_bytes([data[10], data[11]]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        })
    }
}

impl fmt::Display for Ipv4Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} ihl={} tos={} len={} id={} flags={:#06x} ttl={} protocol={} checksum={:#06x} src={} dst={}",
            self.version,
            self.header_len,
            self.tos,
            self.total_len,
            self.identification,
            self.flags,
            self.ttl,
            self.protocol,
            self.checksum,
            self.source,
            self.destination,
        )
    }
}

/// Parse the IPv4 header at the start of a raw-socket read.
pub fn parse_ip_header(data: &[u8]) -> Result<Ipv4Header, PingError> {
    Ipv4Header::from_bytes(data)
}

#[cfg(test)]
pub(crate) fn build_header(source: Ipv4Addr, destination: Ipv4Addr, ttl: u8, payload_len: usize) -> Vec<u8> {
    let total = (IPV4_MIN_HEADER_LEN + payload_len) as u16;
    let mut header = vec![0x45, 0x00];
    header.extend_from_slice(&total.to_be_bytes());
    header.extend_from_slice(&[0x1c, 0x46, 0x40, 0x00, ttl, IPPROTO_ICMP, 0x00, 0x00]);
    header.extend_from_slice(&source.octets());
    header.extend_from_slice(&destination.octets());

    let sum = crate::checksum::checksum(&header);
    header[10..12].copy_from_slice(&sum.to_be_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        let raw = build_header(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(192, 168, 1, 20), 57, 64);
        let header = parse_ip_header(&raw).unwrap();

        assert_eq!(header.version, 4);
        assert_eq!(header.header_len, 20);
        assert_eq!(header.total_len, 84);
        assert_eq!(header.identification, 0x1c46);
        assert_eq!(header.flags, 0x4000);
        assert_eq!(header.ttl, 57);
        assert_eq!(header.protocol, IPPROTO_ICMP);
        assert_eq!(header.source, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(header.destination, Ipv4Addr::new(192, 168, 1, 20));
        assert!(crate::checksum::verify(&raw));
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let raw = build_header(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 64, 0);
        assert!(matches!(
            parse_ip_header(&raw[..19]),
            Err(PingError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_wrong_version_is_malformed() {
        let mut raw = build_header(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 64, 0);
        raw[0] = 0x65;
        assert!(matches!(parse_ip_header(&raw), Err(PingError::MalformedPacket(_))));
    }

    #[test]
    fn test_options_length_honoured() {
        let mut raw = build_header(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 64, 0);
        raw[0] = 0x46;
        // Declares 24 bytes but only 20 are present.
        assert!(matches!(parse_ip_header(&raw), Err(PingError::MalformedPacket(_))));

        raw.extend_from_slice(&[1, 1, 1, 0]);
        assert_eq!(parse_ip_header(&raw).unwrap().header_len, 24);
    }

    #[test]
    fn test_ihl_below_minimum_is_malformed() {
        let mut raw = build_header(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 64, 0);
        raw[0] = 0x44;
        assert!(matches!(parse_ip_header(&raw), Err(PingError::MalformedPacket(_))));
    }
}
