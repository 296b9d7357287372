use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::prelude::*;

use catcher_watch::{
    CatcherEndpoint, SessionId, SinkOptions, WatchConfig, Watcher, WebSocketFeed,
};

#[derive(Parser)]
#[command(name = "rcw")]
#[command(about = "Watch requests hitting a requestcatcher.com subdomain, reconnecting as needed")]
struct Args {
    /// Subdomain prefix to use (default: random)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Random prefix length when --prefix is not given [default: 8]
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    length: Option<u16>,

    /// Highlight occurrences of this text in the output (case-insensitive)
    #[arg(short = 'm', long = "match", value_name = "TEXT")]
    highlight: Option<String>,

    /// Background-friendly mode: only print the URL and log path; all
    /// request details go to the log file
    #[arg(short, long)]
    background: bool,

    /// Log file path (default with --background: ./rcw-<prefix>.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Config file (default: ./rcw.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    // rustls needs a process-wide crypto provider for wss://. Ignore the
    // error if one is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config =
        WatchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let id_length = args.length.map(usize::from).unwrap_or(config.id_length);
    let session = SessionId::explicit_or_generate(args.prefix.as_deref(), id_length);
    let endpoint = CatcherEndpoint::new(session, config.service_domain.clone());

    let sink_options = SinkOptions {
        background: args.background,
        log_file: args.log_file.clone(),
        highlight: args.highlight.clone(),
        color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    };
    let log_path = sink_options.log_path(|| endpoint.default_log_path());

    if args.background {
        println!("Background mode enabled for prefix: {}", endpoint.session());
        println!("Listening on: {}", endpoint.public_url());
        if let Some(ref path) = log_path {
            println!("Logging all requests to: {}", path.display());
            println!("View logs with: tail -f {}", path.display());
        }
        println!();
    }

    let sinks = sink_options
        .assemble(log_path.as_deref())
        .context("Failed to open log file")?;
    if let Some(ref path) = log_path {
        debug!(path = %path.display(), "writing transcript");
    }

    let feed = WebSocketFeed::new(endpoint.feed_url());
    let mut watcher = Watcher::new(feed, sinks, config.watch_options());
    watcher.announce(&endpoint);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let summary = watcher.run(cancel).await;
    info!(
        session = %endpoint.session(),
        events = summary.events,
        reconnects = summary.failures,
        "done"
    );
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "catcher_watch=debug,rcw=debug,info"
    } else {
        "warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Cancel on Ctrl-C, or SIGTERM on unix (`kill <pid>` in background mode).
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
    cancel.cancel();
}
