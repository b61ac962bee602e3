// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Hostname resolution

use crate::error::PingError;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve a hostname or dotted-quad literal to an IPv4 address.
    /// Fails with `PingError::HostUnknown`.
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, PingError>;
}

/// The platform resolver, reached through tokio's blocking-pool lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, PingError> {
        // Try parsing as IP address first
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => return Ok(addr),
            Ok(IpAddr::V6(_)) => return Err(PingError::HostUnknown(host.to_string())),
            Err(_) => {}
        }

        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| {
                log::debug!("lookup of {} failed: {}", host, e);
                PingError::HostUnknown(host.to_string())
            })?;

        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| PingError::HostUnknown(host.to_string()))
    }
}
