// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! pping - Send ICMP echo requests to one or more hosts concurrently

mod report;
mod stats;

use anyhow::{Context, Result};
use asyncping::{Config, PingError, Pinger};
use clap::Parser;
use report::{format_line, Unit};
use stats::{print_statistics, PingStats};
use std::net::Ipv4Addr;
use std::process::exit;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILED_PINGS: i32 = 1;
const EXIT_FATAL: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

/// Ping utility
#[derive(Parser, Debug)]
#[command(name = "pping")]
#[command(about = "Send ICMP ECHO_REQUEST to network hosts", long_about = None)]
struct Args {
    /// Hosts to ping (pinged concurrently)
    #[arg(required = true)]
    hosts: Vec<String>,

    /// Number of pings per host (0 = until interrupted)
    #[arg(short, long, default_value_t = 4)]
    count: u64,

    /// Time to wait for each reply (seconds)
    #[arg(short, long, default_value_t = 4.0)]
    timeout: f64,

    /// Time-To-Live of outgoing packets
    #[arg(short = 'T', long, default_value_t = 64)]
    ttl: u8,

    /// ICMP payload size (bytes)
    #[arg(short, long, default_value_t = 56)]
    size: usize,

    /// Delay between pings to the same host (seconds)
    #[arg(short, long, default_value_t = 0.0)]
    interval: f64,

    /// Source address to send from
    #[arg(short = 'S', long)]
    source: Option<Ipv4Addr>,

    /// Network interface to send from (Linux only)
    #[arg(short = 'I', long)]
    interface: Option<String>,

    /// Unit of reported round-trip times
    #[arg(short, long, value_enum, default_value_t = Unit::Ms)]
    unit: Unit,

    /// Print every packet header and error condition
    #[arg(short = 'D', long)]
    debug: bool,

    /// Report failures as errors instead of labels
    #[arg(short = 'E', long)]
    exceptions: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        Ok(Config {
            timeout: seconds(self.timeout).context("invalid timeout")?,
            ttl: self.ttl,
            size: self.size,
            source: self.source,
            interface: self.interface.clone(),
            debug: self.debug,
            exceptions: self.exceptions,
        })
    }
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("{} is not a valid number of seconds", value))
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    count: u64,
    interval: Duration,
    unit: Unit,
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pping: {:#}", e);
            EXIT_FATAL
        }
    };

    exit(code);
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn run(args: Args) -> Result<i32> {
    let config = args.config()?;
    let plan = Plan {
        count: args.count,
        interval: seconds(args.interval).context("invalid interval")?,
        unit: args.unit,
    };
    debug!(?config, ?plan, "starting");

    let mut hosts = Vec::new();
    let mut tasks = JoinSet::new();
    for host in args.hosts {
        let stats = Arc::new(Mutex::new(PingStats::new()));
        tasks.spawn(ping_host(host.clone(), config.clone(), plan, stats.clone()));
        hosts.push((host, stats));
    }

    let outcome = tokio::select! {
        result = wait_all(&mut tasks) => result,
        _ = tokio::signal::ctrl_c() => Ok(Some(EXIT_INTERRUPTED)),
    };
    // Dropping the host loops also closes their sessions.
    tasks.abort_all();

    let code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pping: {}", e);
            return Ok(EXIT_FATAL);
        }
    };

    let mut all_received = true;
    for (host, stats) in &hosts {
        let stats = stats.lock().unwrap_or_else(|e| e.into_inner());
        print_statistics(host, &stats);
        all_received &= stats.all_received();
    }

    Ok(code.unwrap_or(if all_received { 0 } else { EXIT_FAILED_PINGS }))
}

/// Wait for every host loop. A fatal error from any of them ends the run.
async fn wait_all(tasks: &mut JoinSet<Result<(), PingError>>) -> Result<Option<i32>, PingError> {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => result?,
            Err(e) => return Err(PingError::Other(format!("ping task failed: {}", e))),
        }
    }
    Ok(None)
}

async fn ping_host(
    host: String,
    config: Config,
    plan: Plan,
    stats: Arc<Mutex<PingStats>>,
) -> Result<(), PingError> {
    let source = config.source;
    let pinger = Pinger::new(config);
    let session = pinger.open_session()?;

    let mut attempt: u64 = 0;
    while plan.count == 0 || attempt < plan.count {
        if attempt > 0 && !plan.interval.is_zero() {
            tokio::time::sleep(plan.interval).await;
        }

        let result = pinger.ping_on(&session, &host, attempt as u16).await;
        println!("{}", format_line(&host, source, &result, plan.unit));

        stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(&result);

        attempt += 1;
    }

    Ok(())
}
