//! Echo server demonstrating listeners, a limited queue and graceful shutdown.
//!
//! Run with: cargo run -p udp-dispatch --example echo -- [ADDRESS] [SETTINGS.toml]
//!
//! Send datagrams with e.g. `nc -u 127.0.0.1 9000`. Press Ctrl+C to stop;
//! in-flight replies are given up to two seconds to finish.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use udp_dispatch::{
    DatagramEvent, HaltOptions, ListenerConfig, QueueConfig, Responder, Server, ServerSettings,
    StdQueue,
};

fn echo(responder: &Responder, event: &DatagramEvent) {
    tracing::info!(
        remote = ?event.remote_address,
        length = event.length,
        "echoing datagram"
    );
    if let Err(err) = responder.write(&event.data) {
        tracing::warn!(error = %err, "reply failed");
    }
}

fn log_read_error(err: &std::io::Error) {
    tracing::warn!(error = %err, "read failed");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let default_filter = format!("info,{}", udp_dispatch::logging::directive("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| "127.0.0.1:9000".into());

    let builder = match args.next() {
        Some(path) => {
            let mut settings = ServerSettings::from_file(path)?;
            for listener in &mut settings.listeners {
                *listener = listener.clone().on_packet(echo).on_error(log_read_error);
            }
            settings.into_builder()?
        }
        None => Server::builder()
            .queue(StdQueue::new(
                QueueConfig::new(64)
                    .concurrency_limit(8)
                    .rate_limit_interval(Duration::from_millis(1)),
            )?)
            .listener(
                ListenerConfig::new(address)
                    .on_packet(echo)
                    .on_error(log_read_error),
            )
            .halt_options(HaltOptions::drain(Duration::from_secs(2))),
    };

    let server = Arc::new(
        builder
            .on_halt(|reason| {
                tracing::info!(%reason, "stop hook ran");
                Ok(())
            })
            .build(),
    );

    server.setup().await?;
    for addr in server.local_addrs() {
        tracing::info!(%addr, "echo server listening");
    }

    let runner = server.clone();
    let run = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    server.halt("interrupted", server.halt_options())?;

    if let Some(report) = server.done().await {
        tracing::info!(
            reason = %report.reason,
            timed_out = report.halt_error.is_some(),
            discarded = report.discarded_events,
            abandoned = report.abandoned_workers,
            "server stopped"
        );
    }
    run.await??;
    Ok(())
}
