// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! asyncping - Asynchronous ICMP echo over raw sockets
//!
//! Builds Echo Requests, sends them on a raw IPv4 socket driven by tokio, and
//! correlates Echo Replies or ICMP errors by identifier and sequence. Many
//! pings can run concurrently on one runtime; each attempt is bounded by an
//! absolute deadline.
//!
//! ```rust,no_run
//! use asyncping::{Config, Pinger, PingOutcome};
//!
//! # async fn demo() -> Result<(), asyncping::PingError> {
//! let pinger = Pinger::new(Config::default());
//! match pinger.ping("127.0.0.1").await? {
//!     PingOutcome::Success(rtt) => println!("{:.3} ms", rtt.as_secs_f64() * 1000.0),
//!     other => println!("{:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod config;
pub mod diag;
pub mod error;
pub mod icmp;
pub mod ip;
pub mod ping;
pub mod raw;
pub mod resolve;

pub use checksum::checksum;
pub use config::{Config, SessionOptions, DEFAULT_TIMEOUT, DEFAULT_TTL};
pub use diag::{Diagnostics, LogDiagnostics};
pub use error::PingError;
pub use icmp::{
    build_echo_request, parse_icmp_header, IcmpHeader, IcmpPacket, Origin, ReceivedIcmp,
    ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST,
};
pub use ip::{parse_ip_header, Ipv4Header};
pub use ping::{allocate_identifier, ping, ErrorReport, PingOutcome, Pinger};
pub use raw::{Datagram, RawSocket, Session, Transport};
pub use resolve::{Resolve, SystemResolver};
