// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Ping configuration

use crate::icmp::DEFAULT_PAYLOAD_SIZE;
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_TTL: u8 = 64;

/// Per-engine settings. The two mode flags are read at the start of every
/// attempt, so flipping them through `Pinger::config_mut` affects the next
/// ping only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long to wait for a reply after the request is sent.
    pub timeout: Duration,
    pub ttl: u8,
    /// ICMP payload size in bytes, excluding the 8-byte header.
    pub size: usize,
    pub source: Option<Ipv4Addr>,
    /// Network interface to send from (Linux only).
    pub interface: Option<String>,
    /// Emit every header and error condition to the diagnostic sink.
    pub debug: bool,
    /// Return non-success outcomes as `Err(PingError)`.
    pub exceptions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            ttl: DEFAULT_TTL,
            size: DEFAULT_PAYLOAD_SIZE,
            source: None,
            interface: None,
            debug: false,
            exceptions: false,
        }
    }
}

/// What a socket session needs to know at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub source: Option<Ipv4Addr>,
    pub interface: Option<String>,
    pub ttl: Option<u8>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            source: None,
            interface: None,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            source: config.source,
            interface: config.interface.clone(),
            ttl: Some(config.ttl),
        }
    }
}
