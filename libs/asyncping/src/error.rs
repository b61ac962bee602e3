// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error types

use crate::ping::ErrorReport;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Every failure a ping can end in. Attempt outcomes (timeout, ICMP errors,
/// unknown host) only surface here in exceptions mode; socket setup failures
/// always do.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("cannot resolve {0}: unknown host")]
    HostUnknown(String),

    #[error("request timeout for ICMP packet ({}s)", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("time to live expired (reported by {})", .0.ip_header.source)]
    TimeToLiveExpired(ErrorReport),

    #[error("time exceeded (reported by {})", .0.ip_header.source)]
    TimeExceeded(ErrorReport),

    #[error("destination unreachable (reported by {})", .0.ip_header.source)]
    DestinationUnreachable(ErrorReport),

    #[error("destination host unreachable (reported by {})", .0.ip_header.source)]
    DestinationHostUnreachable(ErrorReport),

    #[error("permission denied: raw ICMP sockets require CAP_NET_RAW or root privileges")]
    PermissionDenied(#[source] io::Error),

    #[error("failed to bind socket to {target}")]
    Bind {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("{0}")]
    Other(String),
}

impl PingError {
    /// Errors that leave no socket to ping with.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::Bind { .. })
    }

    /// The ICMP error headers behind this failure, if it came from one.
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Self::TimeToLiveExpired(report)
            | Self::TimeExceeded(report)
            | Self::DestinationUnreachable(report)
            | Self::DestinationHostUnreachable(report) => Some(report),
            _ => None,
        }
    }

    pub(crate) fn from_socket_error(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => Self::PermissionDenied(err),
            _ => Self::Other(format!("failed to create raw socket: {}", err)),
        }
    }
}
