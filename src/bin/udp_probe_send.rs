use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tokio::net::lookup_host;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use udpprobe::clock::SystemClock;
use udpprobe::config::{SenderConfig, DEFAULT_MTU};
use udpprobe::report::TableReportSink;
use udpprobe::sender::emitter::Emitter;
use udpprobe::session::SendOutcome;

/// Sends padded UDP frames to a receiver at a bounded bitrate
#[derive(Parser)]
struct Args {
    host: String,
    port: u16,

    /// bitrate ceiling in Mbit/s
    #[arg(default_value_t = 3.0)]
    max_mbps: f64,

    #[arg(default_value_t = 5)]
    duration_secs: u64,

    #[arg(default_value_t = DEFAULT_MTU)]
    mtu: usize,

    /// start sending immediately instead of waiting for the next second boundary
    #[arg(long, default_value_t = false)]
    no_align: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[arg(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let destination = lookup_host((args.host.as_str(), args.port)).await
        .with_context(|| format!("cannot resolve {}:{}", args.host, args.port))?
        .next()
        .ok_or_else(|| anyhow!("{}:{} did not resolve to any address", args.host, args.port))?;

    let mut config = SenderConfig::new(destination);
    config.max_bitrate_mbps = args.max_mbps;
    config.duration = Duration::from_secs(args.duration_secs);
    config.mtu = args.mtu;
    if args.no_align {
        config.alignment_threshold = None;
    }

    println!();
    println!("UDP Sender");
    println!();
    println!("Parameters:");
    println!("IP                 : {}", destination.ip());
    println!("Port               : {}", destination.port());
    println!("Maximum mbps       : {}", config.max_bitrate_mbps);
    println!("Duration time(sec) : {}", config.duration.as_secs());
    println!("MTU                : {}", config.mtu);

    let cancel = CancellationToken::new();
    let cancel_on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted - stopping");
            cancel_on_interrupt.cancel();
        }
    });

    let emitter = Emitter::new(Arc::new(config), Arc::new(SystemClock));
    let summary = emitter.run(&mut TableReportSink::default(), &cancel).await?;

    if summary.outcome == SendOutcome::TransmitFailed {
        bail!("send session failed after {} frames", summary.stats.count);
    }
    Ok(())
}
