// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Ping engine
//!
//! One call to [`Pinger::ping`] is one attempt: resolve, send a single Echo
//! Request, then read datagrams until one correlates with the request or the
//! deadline passes. There is no retransmission.

use crate::config::{Config, SessionOptions};
use crate::diag::{Diagnostics, LogDiagnostics};
use crate::error::PingError;
use crate::icmp::{
    parse_icmp_header, IcmpHeader, IcmpPacket, Origin, ReceivedIcmp, ICMP_DEST_UNREACHABLE,
    ICMP_ECHO_REPLY, ICMP_HOST_UNREACHABLE, ICMP_TIME_EXCEEDED, ICMP_TTL_EXPIRED,
};
use crate::ip::{parse_ip_header, Ipv4Header};
use crate::raw::{Datagram, Session, Transport};
use crate::resolve::{Resolve, SystemResolver};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Headers of a received ICMP error that answered one of our requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReport {
    /// IPv4 header of the error datagram; its source is the reporting node.
    pub ip_header: Ipv4Header,
    pub icmp_header: IcmpHeader,
    /// Our request's headers as quoted back by the reporting node.
    pub original: Origin,
}

/// Result of one ping attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    /// Round-trip time, measured on the monotonic clock.
    Success(Duration),
    /// No matching reply before the configured timeout.
    Timeout(Duration),
    HostUnknown(String),
    TimeToLiveExpired(ErrorReport),
    TimeExceeded(ErrorReport),
    DestinationUnreachable(ErrorReport),
    DestinationHostUnreachable(ErrorReport),
    OtherError(String),
}

impl PingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Round-trip time in seconds, for successful attempts.
    pub fn delay_secs(&self) -> Option<f64> {
        match self {
            Self::Success(rtt) => Some(rtt.as_secs_f64()),
            _ => None,
        }
    }

    /// Turn every non-success outcome into the matching `PingError`.
    pub fn into_result(self) -> Result<Duration, PingError> {
        match self {
            Self::Success(rtt) => Ok(rtt),
            Self::Timeout(timeout) => Err(PingError::Timeout(timeout)),
            Self::HostUnknown(host) => Err(PingError::HostUnknown(host)),
            Self::TimeToLiveExpired(report) => Err(PingError::TimeToLiveExpired(report)),
            Self::TimeExceeded(report) => Err(PingError::TimeExceeded(report)),
            Self::DestinationUnreachable(report) => Err(PingError::DestinationUnreachable(report)),
            Self::DestinationHostUnreachable(report) => {
                Err(PingError::DestinationHostUnreachable(report))
            }
            Self::OtherError(message) => Err(PingError::Other(message)),
        }
    }
}

static NEXT_IDENTIFIER: AtomicU16 = AtomicU16::new(0);

/// A fresh ICMP identifier for this process. Consecutive calls return
/// distinct values until the 16-bit counter wraps.
pub fn allocate_identifier() -> u16 {
    let pid = nix::unistd::getpid().as_raw() as u32;
    let counter = NEXT_IDENTIFIER.fetch_add(1, Ordering::Relaxed) as u32;
    (((pid << 5) ^ counter ^ (pid >> 11)) & 0xFFFF) as u16
}

/// What a received datagram means for the pending attempt.
#[derive(Debug, Clone, PartialEq)]
enum Verdict {
    Reply,
    Error(PingOutcome),
    Discard(&'static str),
}

/// The ping engine. Owns an ICMP identifier and a sequence counter; each
/// `ping*` call runs one attempt.
pub struct Pinger {
    config: Config,
    identifier: u16,
    sequence: AtomicU16,
    resolver: Arc<dyn Resolve>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Pinger {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            identifier: allocate_identifier(),
            sequence: AtomicU16::new(0),
            resolver: Arc::new(SystemResolver),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_sequence_start(self, start: u16) -> Self {
        self.sequence.store(start, Ordering::Relaxed);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Open a session with this engine's source, interface and TTL.
    pub fn open_session(&self) -> Result<Session, PingError> {
        Session::open(&SessionOptions::from(&self.config))
    }

    /// Ping `destination` once, using the next sequence number and a
    /// session opened for this attempt alone.
    ///
    /// Socket setup failures are always returned as `Err`. Other failures
    /// are returned as `Ok(outcome)` unless exceptions mode is on.
    pub async fn ping(&self, destination: &str) -> Result<PingOutcome, PingError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.ping_seq(destination, sequence).await
    }

    pub async fn ping_seq(&self, destination: &str, sequence: u16) -> Result<PingOutcome, PingError> {
        let config = self.config.clone();

        let address = match self.resolve(destination, &config).await {
            Ok(address) => address,
            Err(outcome) => return self.finish(outcome, &config),
        };

        let mut session = self.open_session()?;
        let outcome = self.exchange(&session, address, sequence, &config).await;
        session.close();

        self.finish(outcome, &config)
    }

    /// Ping `destination` over a caller-owned transport.
    ///
    /// Attempts sharing one transport must use distinct identifier/sequence
    /// pairs. Each datagram goes to whichever attempt reads it, so
    /// concurrent attempts on a shared transport can drop each other's
    /// replies and time out.
    pub async fn ping_on<T>(
        &self,
        transport: &T,
        destination: &str,
        sequence: u16,
    ) -> Result<PingOutcome, PingError>
    where
        T: Transport + ?Sized,
    {
        let config = self.config.clone();

        let outcome = match self.resolve(destination, &config).await {
            Ok(address) => self.exchange(transport, address, sequence, &config).await,
            Err(outcome) => outcome,
        };

        self.finish(outcome, &config)
    }

    async fn resolve(&self, destination: &str, config: &Config) -> Result<Ipv4Addr, PingOutcome> {
        match self.resolver.resolve(destination).await {
            Ok(address) => {
                self.debug(config, || format!("destination {} resolved to {}", destination, address));
                Ok(address)
            }
            Err(e) => {
                self.debug(config, || format!("resolution failed: {}", e));
                Err(PingOutcome::HostUnknown(destination.to_string()))
            }
        }
    }

    async fn exchange<T>(
        &self,
        transport: &T,
        address: Ipv4Addr,
        sequence: u16,
        config: &Config,
    ) -> PingOutcome
    where
        T: Transport + ?Sized,
    {
        let request = IcmpPacket::echo_request(self.identifier, sequence, config.size);
        let bytes = request.to_bytes();

        let sent_at = Instant::now();
        let deadline = deadline_after(sent_at, config.timeout);

        self.debug(config, || format!("sending to {}: {}", address, request.header));
        if let Err(e) = transport.send(address, &bytes).await {
            self.debug(config, || format!("send to {} failed: {}", address, e));
            return PingOutcome::OtherError(format!("send to {} failed: {}", address, e));
        }

        loop {
            if Instant::now() >= deadline {
                self.debug(config, || format!("timeout after {:?}", config.timeout));
                return PingOutcome::Timeout(config.timeout);
            }

            let datagram = match transport.receive(deadline).await {
                Ok(Some(datagram)) => datagram,
                Ok(None) => {
                    self.debug(config, || format!("timeout after {:?}", config.timeout));
                    return PingOutcome::Timeout(config.timeout);
                }
                Err(e) => {
                    self.debug(config, || format!("receive failed: {}", e));
                    return PingOutcome::OtherError(format!("receive failed: {}", e));
                }
            };
            let received_at = Instant::now();

            match self.classify(&datagram, sequence, config) {
                Verdict::Reply => return PingOutcome::Success(received_at - sent_at),
                Verdict::Error(outcome) => {
                    self.debug(config, || format!("ICMP error from {}: {:?}", datagram.source, outcome));
                    return outcome;
                }
                Verdict::Discard(reason) => {
                    log::trace!("datagram from {} discarded: {}", datagram.source, reason);
                    self.debug(config, || format!("packet filtered out: {}", reason));
                }
            }
        }
    }

    fn classify(&self, datagram: &Datagram, sequence: u16, config: &Config) -> Verdict {
        let ip_header = match parse_ip_header(&datagram.data) {
            Ok(header) => header,
            Err(e) => return Verdict::Discard(malformed_reason(&e)),
        };
        self.debug(config, || format!("received IP header: {}", ip_header));

        let icmp = match parse_icmp_header(&datagram.data, ip_header.header_len) {
            Ok(icmp) => icmp,
            Err(e) => return Verdict::Discard(malformed_reason(&e)),
        };
        self.debug(config, || format!("received ICMP header: {}", icmp.header));

        correlate(ip_header, &icmp, self.identifier, sequence)
    }

    fn finish(&self, outcome: PingOutcome, config: &Config) -> Result<PingOutcome, PingError> {
        if !outcome.is_success() {
            self.debug(config, || format!("attempt failed: {:?}", outcome));
        }

        if config.exceptions {
            outcome.into_result().map(PingOutcome::Success)
        } else {
            Ok(outcome)
        }
    }

    fn debug<F>(&self, config: &Config, message: F)
    where
        F: FnOnce() -> String,
    {
        if config.debug {
            self.diagnostics.emit(&message());
        }
    }
}

/// Timeouts too large to represent end roughly thirty years out.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

fn malformed_reason(err: &PingError) -> &'static str {
    match err {
        PingError::MalformedPacket(reason) => reason,
        _ => "unparseable datagram",
    }
}

fn correlate(ip_header: Ipv4Header, icmp: &ReceivedIcmp, identifier: u16, sequence: u16) -> Verdict {
    let header = icmp.header;

    match header.icmp_type {
        ICMP_ECHO_REPLY => {
            if header.matches(identifier, sequence) {
                Verdict::Reply
            } else {
                Verdict::Discard("echo reply id/seq mismatch")
            }
        }
        ICMP_TIME_EXCEEDED | ICMP_DEST_UNREACHABLE => {
            let original = match icmp.origin {
                Some(origin) => origin,
                None => return Verdict::Discard("ICMP error without quoted request"),
            };
            if icmp.correlation() != Some((identifier, sequence)) {
                return Verdict::Discard("ICMP error for another request");
            }

            let report = ErrorReport { ip_header, icmp_header: header, original };
            let outcome = match (header.icmp_type, header.icmp_code) {
                (ICMP_TIME_EXCEEDED, ICMP_TTL_EXPIRED) => PingOutcome::TimeToLiveExpired(report),
                (ICMP_TIME_EXCEEDED, _) => PingOutcome::TimeExceeded(report),
                (_, ICMP_HOST_UNREACHABLE) => PingOutcome::DestinationHostUnreachable(report),
                _ => PingOutcome::DestinationUnreachable(report),
            };
            Verdict::Error(outcome)
        }
        _ => Verdict::Discard("irrelevant ICMP type"),
    }
}

/// Ping `destination` once with a throwaway engine.
pub async fn ping(destination: &str, config: &Config) -> Result<PingOutcome, PingError> {
    Pinger::new(config.clone()).ping(destination).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::{
        build_echo_request, ICMP_ECHO_REQUEST, ICMP_FRAGMENT_REASSEMBLY_EXPIRED, ICMP_NET_UNREACHABLE,
    };
    use crate::ip::build_header;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    const ME: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);
    const TARGET: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 7);
    const ROUTER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

    /// Plays back scripted datagrams, each after a delay from the previous
    /// one, then stays silent until the deadline.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<(Duration, Datagram)>>,
        sent: Mutex<Vec<(Ipv4Addr, Vec<u8>)>>,
        receives: AtomicUsize,
        fail_send: bool,
    }

    impl ScriptedTransport {
        fn with(script: Vec<(Duration, Datagram)>) -> Self {
            Self { script: Mutex::new(script.into()), ..Default::default() }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, address: Ipv4Addr, bytes: &[u8]) -> io::Result<()> {
            if self.fail_send {
                return Err(io::Error::new(io::ErrorKind::Other, "network is unreachable"));
            }
            self.sent.lock().unwrap().push((address, bytes.to_vec()));
            Ok(())
        }

        async fn receive(&self, deadline: Instant) -> io::Result<Option<Datagram>> {
            self.receives.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some((delay, datagram)) if Instant::now() + delay < deadline => {
                    tokio::time::sleep(delay).await;
                    Ok(Some(datagram))
                }
                _ => {
                    tokio::time::sleep_until(deadline).await;
                    Ok(None)
                }
            }
        }
    }

    struct FixedResolver;

    #[async_trait]
    impl Resolve for FixedResolver {
        async fn resolve(&self, host: &str) -> Result<Ipv4Addr, PingError> {
            match host {
                "target.test" => Ok(TARGET),
                _ => host.parse().map_err(|_| PingError::HostUnknown(host.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct Collected(Mutex<Vec<String>>);

    impl Diagnostics for Collected {
        fn emit(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn pinger(config: Config) -> Pinger {
        Pinger::new(config)
            .with_identifier(0x4242)
            .with_resolver(Arc::new(FixedResolver))
    }

    fn echo_reply(id: u16, seq: u16) -> Datagram {
        let mut icmp = build_echo_request(id, seq, 56);
        icmp[0] = ICMP_ECHO_REPLY;
        let mut data = build_header(TARGET, ME, 55, icmp.len());
        data.extend_from_slice(&icmp);
        Datagram { source: TARGET, data }
    }

    fn looped_request(id: u16, seq: u16) -> Datagram {
        let icmp = build_echo_request(id, seq, 56);
        let mut data = build_header(ME, TARGET, 64, icmp.len());
        data.extend_from_slice(&icmp);
        Datagram { source: ME, data }
    }

    fn icmp_error(icmp_type: u8, code: u8, id: u16, seq: u16) -> Datagram {
        let request = build_echo_request(id, seq, 56);
        let mut quoted = build_header(ME, TARGET, 1, request.len());
        quoted.extend_from_slice(&request[..8]);

        let mut icmp = vec![icmp_type, code, 0, 0, 0, 0, 0, 0];
        icmp.extend_from_slice(&quoted);

        let mut data = build_header(ROUTER, ME, 64, icmp.len());
        data.extend_from_slice(&icmp);
        Datagram { source: ROUTER, data }
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_reply_succeeds() {
        let transport = ScriptedTransport::with(vec![(Duration::from_millis(12), echo_reply(0x4242, 3))]);
        let outcome = pinger(Config::default()).ping_on(&transport, "target.test", 3).await.unwrap();

        assert_eq!(outcome, PingOutcome::Success(Duration::from_millis(12)));
        assert!((outcome.delay_secs().unwrap() - 0.012).abs() < 1e-9);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TARGET);
        assert_eq!(sent[0].1, build_echo_request(0x4242, 3, 56));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_replies_never_resolve() {
        let transport = ScriptedTransport::with(vec![
            (Duration::from_millis(5), echo_reply(0x4243, 3)),
            (Duration::from_millis(5), echo_reply(0x4242, 4)),
            (Duration::from_millis(5), looped_request(0x4242, 3)),
            (Duration::from_millis(5), icmp_error(ICMP_TIME_EXCEEDED, ICMP_TTL_EXPIRED, 0x4242, 9)),
        ]);
        let config = Config { timeout: Duration::from_secs(2), ..Config::default() };

        let started = Instant::now();
        let outcome = pinger(config).ping_on(&transport, "target.test", 3).await.unwrap();

        assert_eq!(outcome, PingOutcome::Timeout(Duration::from_secs(2)));
        // Discards must not extend the deadline.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(transport.receives.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_discards_still_matches() {
        let transport = ScriptedTransport::with(vec![
            (Duration::from_millis(1), looped_request(0x4242, 0)),
            (Duration::from_millis(2), echo_reply(0x1111, 0)),
            (Duration::from_millis(3), echo_reply(0x4242, 0)),
            (Duration::from_millis(1), echo_reply(0x4242, 0)),
        ]);
        let outcome = pinger(Config::default()).ping_on(&transport, "target.test", 0).await.unwrap();

        assert_eq!(outcome, PingOutcome::Success(Duration::from_millis(6)));
        // The duplicate is left unread.
        assert_eq!(transport.script.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_blocks() {
        let transport = ScriptedTransport::with(vec![(Duration::ZERO, echo_reply(0x4242, 0))]);
        let config = Config { timeout: Duration::ZERO, ..Config::default() };

        let started = Instant::now();
        let outcome = pinger(config).ping_on(&transport, "target.test", 0).await.unwrap();

        assert_eq!(outcome, PingOutcome::Timeout(Duration::ZERO));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(transport.receives.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_host_skips_transport() {
        let transport = ScriptedTransport::default();
        let outcome = pinger(Config::default())
            .ping_on(&transport, "not.exist.invalid", 0)
            .await
            .unwrap();

        assert_eq!(outcome, PingOutcome::HostUnknown("not.exist.invalid".into()));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(transport.receives.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_host_opens_no_socket() {
        // Would be PermissionDenied if a socket were opened unprivileged.
        let outcome = pinger(Config::default()).ping_seq("not.exist.invalid", 0).await.unwrap();
        assert_eq!(outcome, PingOutcome::HostUnknown("not.exist.invalid".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expired_carries_router_header() {
        let transport = ScriptedTransport::with(vec![(
            Duration::from_millis(3),
            icmp_error(ICMP_TIME_EXCEEDED, ICMP_TTL_EXPIRED, 0x4242, 1),
        )]);
        let config = Config { ttl: 1, ..Config::default() };
        let outcome = pinger(config).ping_on(&transport, "target.test", 1).await.unwrap();

        match outcome {
            PingOutcome::TimeToLiveExpired(report) => {
                assert_eq!(report.ip_header.source, ROUTER);
                assert_eq!(report.icmp_header.icmp_type, ICMP_TIME_EXCEEDED);
                assert_eq!(report.original.ip_header.destination, TARGET);
                assert_eq!(report.original.icmp_header.icmp_type, ICMP_ECHO_REQUEST);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_classification() {
        let cases = [
            (ICMP_TIME_EXCEEDED, ICMP_FRAGMENT_REASSEMBLY_EXPIRED, "TimeExceeded"),
            (ICMP_DEST_UNREACHABLE, ICMP_HOST_UNREACHABLE, "DestinationHostUnreachable"),
            (ICMP_DEST_UNREACHABLE, ICMP_NET_UNREACHABLE, "DestinationUnreachable"),
        ];

        for (icmp_type, code, expected) in cases {
            let transport =
                ScriptedTransport::with(vec![(Duration::from_millis(1), icmp_error(icmp_type, code, 0x4242, 8))]);
            let outcome = pinger(Config::default()).ping_on(&transport, "target.test", 8).await.unwrap();

            let name = match outcome {
                PingOutcome::TimeExceeded(_) => "TimeExceeded",
                PingOutcome::DestinationHostUnreachable(_) => "DestinationHostUnreachable",
                PingOutcome::DestinationUnreachable(_) => "DestinationUnreachable",
                _ => "other",
            };
            assert_eq!(name, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_datagrams_are_discarded() {
        let mut truncated = echo_reply(0x4242, 0);
        truncated.data.truncate(24);
        let garbage = Datagram { source: TARGET, data: vec![0x60; 40] };

        let transport = ScriptedTransport::with(vec![
            (Duration::from_millis(1), truncated),
            (Duration::from_millis(1), garbage),
            (Duration::from_millis(1), echo_reply(0x4242, 0)),
        ]);
        let outcome = pinger(Config::default()).ping_on(&transport, "target.test", 0).await.unwrap();

        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_other_error() {
        let transport = ScriptedTransport { fail_send: true, ..Default::default() };
        let outcome = pinger(Config::default()).ping_on(&transport, "target.test", 0).await.unwrap();

        assert!(matches!(outcome, PingOutcome::OtherError(ref msg) if msg.contains("network is unreachable")));
        assert_eq!(transport.receives.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exceptions_mode_raises() {
        let config = Config { exceptions: true, timeout: Duration::from_secs(1), ..Config::default() };
        let pinger = pinger(config);

        let err = pinger.ping_on(&ScriptedTransport::default(), "target.test", 0).await.unwrap_err();
        assert!(matches!(err, PingError::Timeout(t) if t == Duration::from_secs(1)));

        let err = pinger
            .ping_on(&ScriptedTransport::default(), "not.exist.invalid", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PingError::HostUnknown(_)));

        let transport = ScriptedTransport::with(vec![(
            Duration::from_millis(1),
            icmp_error(ICMP_TIME_EXCEEDED, ICMP_TTL_EXPIRED, 0x4242, 0),
        )]);
        let err = pinger.ping_on(&transport, "target.test", 0).await.unwrap_err();
        assert_eq!(err.report().map(|r| r.ip_header.source), Some(ROUTER));

        let transport = ScriptedTransport::with(vec![(Duration::from_millis(1), echo_reply(0x4242, 0))]);
        let outcome = pinger.ping_on(&transport, "target.test", 0).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_mode_emits_diagnostics() {
        let sink = Arc::new(Collected::default());
        let transport = ScriptedTransport::with(vec![
            (Duration::from_millis(1), echo_reply(0x9999, 0)),
            (Duration::from_millis(1), echo_reply(0x4242, 0)),
        ]);

        let mut pinger = pinger(Config::default()).with_diagnostics(sink.clone());
        pinger.ping_on(&transport, "target.test", 0).await.unwrap();
        assert!(sink.0.lock().unwrap().is_empty());

        pinger.config_mut().debug = true;
        let transport = ScriptedTransport::with(vec![
            (Duration::from_millis(1), echo_reply(0x9999, 0)),
            (Duration::from_millis(1), echo_reply(0x4242, 0)),
        ]);
        pinger.ping_on(&transport, "target.test", 0).await.unwrap();
        pinger.ping_on(&ScriptedTransport::default(), "nowhere", 0).await.unwrap();

        let lines = sink.0.lock().unwrap();
        assert!(lines.iter().any(|l| l.starts_with("sending to 198.51.100.7")));
        assert_eq!(lines.iter().filter(|l| l.starts_with("received IP header")).count(), 2);
        assert_eq!(lines.iter().filter(|l| l.starts_with("received ICMP header")).count(), 2);
        assert!(lines.iter().any(|l| l.contains("id/seq mismatch")));
        assert!(lines.iter().any(|l| l.starts_with("resolution failed")));
        assert!(lines.iter().any(|l| l.contains("HostUnknown")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let config = Config { timeout: Duration::MAX, ..Config::default() };
        let transport = ScriptedTransport::with(vec![(Duration::from_millis(5), echo_reply(0x4242, 0))]);
        let outcome = pinger(config).ping_on(&transport, "target.test", 0).await.unwrap();
        assert_eq!(outcome, PingOutcome::Success(Duration::from_millis(5)));

        let huge = Duration::try_from_secs_f64(1e19).unwrap();
        let config = Config { timeout: huge, ..Config::default() };
        let transport = ScriptedTransport::with(vec![(Duration::from_millis(5), echo_reply(0x4242, 1))]);
        let outcome = pinger(config).ping_on(&transport, "target.test", 1).await.unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_deadline_after_saturates() {
        let start = Instant::now();
        assert_eq!(deadline_after(start, Duration::from_secs(4)), start + Duration::from_secs(4));
        assert_eq!(deadline_after(start, Duration::MAX), start + FAR_FUTURE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_counter_advances() {
        let pinger = pinger(Config::default()).with_sequence_start(65535);
        assert_eq!(pinger.sequence.fetch_add(1, Ordering::Relaxed), 65535);
        assert_eq!(pinger.sequence.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_identifiers_are_distinct() {
        let ids: std::collections::HashSet<u16> = (0..1000).map(|_| allocate_identifier()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            PingOutcome::Success(Duration::from_millis(3)).into_result().unwrap(),
            Duration::from_millis(3)
        );
        assert!(matches!(
            PingOutcome::OtherError("boom".into()).into_result(),
            Err(PingError::Other(msg)) if msg == "boom"
        ));
        assert_eq!(PingOutcome::Timeout(Duration::from_secs(4)).delay_secs(), None);
    }
}
