// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Raw socket implementation
//!
//! `RawSocket` is a thin owner of a non-blocking `SOCK_RAW` descriptor.
//! `Session` registers it with the tokio reactor so sends and receives
//! suspend the calling task instead of the thread.

use crate::config::SessionOptions;
use crate::error::PingError;
use async_trait::async_trait;
use std::io;
use std::mem::size_of;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, RawFd};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::time::Instant;

/// Large enough for any IPv4 datagram.
const RECV_BUFFER_SIZE: usize = 65536;

/// One datagram as read from the socket, IPv4 header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub source: Ipv4Addr,
    pub data: Vec<u8>,
}

impl Datagram {
    /// Copy out a received datagram so it does not keep the receive buffer alive.
    fn copied(source: Ipv4Addr, data: &[u8]) -> Self {
        Self {
            source,
            data: data.to_vec(),
        }
    }
}

pub struct RawSocket {
    fd: libc::c_int,
}

impl RawSocket {
    pub fn new(protocol: i32) -> io::Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
                protocol,
            )
        };

        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { fd })
    }

    pub fn bind(&self, addr: Ipv4Addr) -> io::Result<()> {
        let sockaddr = sockaddr_in(SocketAddrV4::new(addr, 0));
        let ret = unsafe {
            libc::bind(
                self.fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn bind_device(&self, interface: &str) -> io::Result<()> {
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_BINDTODEVICE,
                interface.as_ptr() as *const libc::c_void,
                interface.len() as libc::socklen_t,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn bind_device(&self, _interface: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "binding to an interface is only supported on Linux",
        ))
    }

    pub fn set_ttl(&self, ttl: u8) -> io::Result<()> {
        let value = ttl as libc::c_int;
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::IPPROTO_IP,
                libc::IP_TTL,
                &value as *const _ as *const libc::c_void,
                size_of::<libc::c_int>() as libc::socklen_t,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn send_to(&self, buf: &[u8], dest: SocketAddrV4) -> io::Result<usize> {
        let addr = sockaddr_in(dest);

        let sent = unsafe {
            libc::sendto(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                0,
                &addr as *const _ as *const libc::sockaddr,
                size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };

        if sent < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(sent as usize)
    }

    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, Ipv4Addr)> {
        let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut addr_len = size_of::<libc::sockaddr_in>() as libc::socklen_t;

        let recv_len = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &mut sockaddr as *mut _ as *mut libc::sockaddr,
                &mut addr_len,
            )
        };

        if recv_len < 0 {
            return Err(io::Error::last_os_error());
        }

        let source = Ipv4Addr::from(sockaddr.sin_addr.s_addr.to_ne_bytes());
        Ok((recv_len as usize, source))
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

fn sockaddr_in(addr: SocketAddrV4) -> libc::sockaddr_in {
    let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
    sockaddr.sin_port = addr.port().to_be();
    sockaddr.sin_addr = libc::in_addr {
        s_addr: u32::from_ne_bytes(addr.ip().octets()),
    };
    sockaddr
}

/// Datagram transport the ping engine runs on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmit `bytes` to `address`. Does not wait for any reply.
    async fn send(&self, address: Ipv4Addr, bytes: &[u8]) -> io::Result<()>;

    /// Wait for the next datagram until `deadline`. `Ok(None)` means the
    /// deadline passed first.
    async fn receive(&self, deadline: Instant) -> io::Result<Option<Datagram>>;
}

/// An open raw ICMPv4 socket registered with the async runtime.
///
/// A session may be shared by several concurrent attempts (e.g. through an
/// `Arc`), provided each attempt uses its own identifier or sequence.
pub struct Session {
    inner: Option<AsyncFd<RawSocket>>,
}

impl Session {
    /// Open a raw ICMP socket. Must be called from within a tokio runtime.
    pub fn open(options: &SessionOptions) -> Result<Self, PingError> {
        let socket = RawSocket::new(libc::IPPROTO_ICMP).map_err(PingError::from_socket_error)?;

        if let Some(interface) = &options.interface {
            socket.bind_device(interface).map_err(|e| bind_error(interface, e))?;
            log::debug!("socket bound to interface {}", interface);
        }

        if let Some(source) = options.source {
            socket.bind(source).map_err(|e| bind_error(&source.to_string(), e))?;
            log::debug!("socket bound to source address {}", source);
        }

        if let Some(ttl) = options.ttl {
            socket
                .set_ttl(ttl)
                .map_err(|e| PingError::Other(format!("failed to set ttl {}: {}", ttl, e)))?;
        }

        let fd = AsyncFd::with_interest(socket, Interest::READABLE | Interest::WRITABLE)
            .map_err(|e| PingError::Other(format!("failed to register socket: {}", e)))?;

        log::debug!("raw ICMP socket opened (fd {})", fd.as_raw_fd());
        Ok(Self { inner: Some(fd) })
    }

    pub fn set_ttl(&self, ttl: u8) -> io::Result<()> {
        self.fd()?.get_ref().set_ttl(ttl)
    }

    pub async fn send(&self, address: Ipv4Addr, bytes: &[u8]) -> io::Result<()> {
        let fd = self.fd()?;
        let dest = SocketAddrV4::new(address, 0);

        loop {
            let mut guard = fd.writable().await?;
            match guard.try_io(|inner| inner.get_ref().send_to(bytes, dest)) {
                Ok(result) => {
                    let sent = result?;
                    if sent != bytes.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("short send: {} of {} bytes", sent, bytes.len()),
                        ));
                    }
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    pub async fn receive(&self, deadline: Instant) -> io::Result<Option<Datagram>> {
        let fd = self.fd()?;

        match tokio::time::timeout_at(deadline, recv_datagram(fd)).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Release the socket. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(fd) = self.inner.take() {
            log::debug!("raw ICMP socket closed (fd {})", fd.as_raw_fd());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn fd(&self) -> io::Result<&AsyncFd<RawSocket>> {
        self.inner
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "session is closed"))
    }
}

async fn recv_datagram(fd: &AsyncFd<RawSocket>) -> io::Result<Datagram> {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        let mut guard = fd.readable().await?;
        match guard.try_io(|inner| inner.get_ref().recv_from(&mut buf)) {
            Ok(result) => {
                let (len, source) = result?;
                return Ok(Datagram::copied(source, &buf[..len]));
            }
            Err(_would_block) => continue,
        }
    }
}

fn bind_error(target: &str, err: io::Error) -> PingError {
    match err.raw_os_error() {
        Some(libc::EPERM) | Some(libc::EACCES) => PingError::PermissionDenied(err),
        _ => PingError::Bind {
            target: target.to_string(),
            source: err,
        },
    }
}

#[async_trait]
impl Transport for Session {
    async fn send(&self, address: Ipv4Addr, bytes: &[u8]) -> io::Result<()> {
        Session::send(self, address, bytes).await
    }

    async fn receive(&self, deadline: Instant) -> io::Result<Option<Datagram>> {
        Session::receive(self, deadline).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, address: Ipv4Addr, bytes: &[u8]) -> io::Result<()> {
        (**self).send(address, bytes).await
    }

    async fn receive(&self, deadline: Instant) -> io::Result<Option<Datagram>> {
        (**self).receive(deadline).await
    }
}
