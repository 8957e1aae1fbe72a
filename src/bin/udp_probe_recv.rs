use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use udpprobe::config::ReceiverConfig;
use udpprobe::receiver::receive_loop::ReceiveLoop;
use udpprobe::report::TableReportSink;

/// Counts UDP frames from a sender and reports the received rate
#[derive(Parser)]
struct Args {
    port: u16,

    /// start a fresh session after each one ends
    #[arg(short, long = "loop", default_value_t = false)]
    loop_mode: bool,

    /// timeout of each receive call
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// number of seconds kept open to tolerate reordering
    #[arg(long, default_value_t = 2)]
    window: usize,

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

    let mut config = ReceiverConfig::new(args.port);
    config.loop_mode = args.loop_mode;
    config.recv_timeout = Duration::from_millis(args.timeout_ms);
    config.reorder_window = args.window;

    println!();
    println!("UDP Receiver");
    println!();
    println!("Parameters:");
    println!("Receive Port : {}", args.port);

    let cancel = CancellationToken::new();
    let cancel_on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted - stopping");
            cancel_on_interrupt.cancel();
        }
    });

    let receive_loop = ReceiveLoop::new(Arc::new(config));
    receive_loop.run(&mut TableReportSink::default(), &cancel).await?;
    Ok(())
}
