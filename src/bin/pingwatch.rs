use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use pingwatch::actors::monitor::MonitorHandle;
use pingwatch::config::read_config_file;
use pingwatch::probe::PingProber;
use pingwatch::registry::load_devices;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

/// Log to stderr and to a daily-rolling file, rotating in lockstep with the
/// per-day outage stores.
fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "monitor.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = filter::Targets::new().with_targets(vec![("pingwatch", LevelFilter::TRACE)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = read_config_file(&args.file)?;
    let _guard = init(&config.log_dir)?;
    trace!("started with args: {args:?}");

    let devices = load_devices(&config.devices)?;
    info!(
        "monitoring {} devices every {}s (probe timeout {}s)",
        devices.len(),
        config.interval,
        config.timeout
    );

    let (event_tx, _) = broadcast::channel(64);
    let handle = MonitorHandle::spawn(&config, devices, Arc::new(PingProber::new()), event_tx);

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }

    info!("shutdown requested, finishing current cycle");
    handle.shutdown().await?;

    Ok(())
}
