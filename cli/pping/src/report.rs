// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Output lines for individual ping attempts

use asyncping::{PingError, PingOutcome};
use clap::ValueEnum;
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Unit {
    /// Seconds
    S,
    /// Milliseconds
    Ms,
}

pub fn format_delay(rtt: Duration, unit: Unit) -> String {
    match unit {
        Unit::S => format!("{:.3}s", rtt.as_secs_f64()),
        Unit::Ms => format!("{}ms", rtt.as_millis()),
    }
}

pub fn outcome_label(outcome: &PingOutcome, unit: Unit) -> String {
    match outcome {
        PingOutcome::Success(rtt) => format_delay(*rtt, unit),
        PingOutcome::Timeout(timeout) if timeout.is_zero() => "Timeout".to_string(),
        PingOutcome::Timeout(timeout) => format!("Timeout > {}s", timeout.as_secs_f64()),
        PingOutcome::HostUnknown(_) => "Host unknown".to_string(),
        PingOutcome::TimeToLiveExpired(report) => format!("TTL expired at {}", report.ip_header.source),
        PingOutcome::TimeExceeded(report) => format!("Time exceeded at {}", report.ip_header.source),
        PingOutcome::DestinationUnreachable(report) => {
            format!("Destination unreachable from {}", report.ip_header.source)
        }
        PingOutcome::DestinationHostUnreachable(report) => {
            format!("Destination host unreachable from {}", report.ip_header.source)
        }
        PingOutcome::OtherError(_) => "Error".to_string(),
    }
}

/// One line per attempt: `ping '<host>'[ from '<src>'] ... <result>`.
pub fn format_line(
    host: &str,
    source: Option<Ipv4Addr>,
    result: &Result<PingOutcome, PingError>,
    unit: Unit,
) -> String {
    let mut line = format!("ping '{}'", host);
    if let Some(source) = source {
        line.push_str(&format!(" from '{}'", source));
    }
    line.push_str(" ... ");

    match result {
        Ok(outcome) => line.push_str(&outcome_label(outcome, unit)),
        Err(e) => line.push_str(&format!("Error: {}", e)),
    }
    line
}
