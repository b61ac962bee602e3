// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Per-host ping statistics

use asyncping::{PingError, PingOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    /// Attempts that never sent a packet because the host did not resolve.
    pub unresolved: u64,
    pub total_time_ms: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
}

impl PingStats {
    pub fn new() -> Self {
        Self {
            packets_sent: 0,
            packets_received: 0,
            unresolved: 0,
            total_time_ms: 0.0,
            min_rtt_ms: f64::MAX,
            max_rtt_ms: 0.0,
        }
    }

    pub fn record(&mut self, result: &Result<PingOutcome, PingError>) {
        match result {
            Ok(PingOutcome::HostUnknown(_)) | Err(PingError::HostUnknown(_)) => {
                self.unresolved += 1;
                return;
            }
            _ => self.packets_sent += 1,
        }
        if let Ok(PingOutcome::Success(rtt)) = result {
            self.update(rtt.as_secs_f64() * 1000.0);
        }
    }

    fn update(&mut self, rtt_ms: f64) {
        self.packets_received += 1;
        self.total_time_ms += rtt_ms;
        self.min_rtt_ms = self.min_rtt_ms.min(rtt_ms);
        self.max_rtt_ms = self.max_rtt_ms.max(rtt_ms);
    }

    pub fn all_received(&self) -> bool {
        self.unresolved == 0 && self.packets_sent == self.packets_received
    }

    pub fn packet_loss_percent(&self) -> f64 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        ((self.packets_sent - self.packets_received) as f64 / self.packets_sent as f64) * 100.0
    }

    pub fn avg_rtt_ms(&self) -> f64 {
        if self.packets_received == 0 {
            return 0.0;
        }
        self.total_time_ms / self.packets_received as f64
    }
}

impl Default for PingStats {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_statistics(host: &str, stats: &PingStats) {
    println!();
    println!("--- {} ping statistics ---", host);

    let mut summary = format!(
        "{} packets transmitted, {} received, {:.0}% packet loss",
        stats.packets_sent,
        stats.packets_received,
        stats.packet_loss_percent()
    );
    if stats.unresolved > 0 {
        summary.push_str(&format!(", {} unresolved", stats.unresolved));
    }
    println!("{}", summary);

    if stats.packets_received > 0 {
        println!(
            "rtt min/avg/max = {:.3}/{:.3}/{:.3} ms",
            stats.min_rtt_ms,
            stats.avg_rtt_ms(),
            stats.max_rtt_ms
        );
    }
}
