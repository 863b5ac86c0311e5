//! Signaling broker demo
//!
//! Run with: cargo run --example signal_server -- [PUBLIC_HOST] [--h264]
//!
//! Examples:
//!   cargo run --example signal_server                  # 0.0.0.0:8000, advertises 127.0.0.1
//!   PORT=9000 cargo run --example signal_server        # listen on port 9000
//!   cargo run --example signal_server 203.0.113.7      # advertise a public address
//!   cargo run --example signal_server -- --h264        # answer with H.264 instead of VP8
//!
//! ## Protocol
//!
//! Open a WebSocket on `ws://host:port/channel` and send one offer:
//!
//! ```text
//! {"cmd":"publish-offer","sdp":"v=0..."}
//! {"cmd":"watch-offer","sdp":"v=0...","stream":"<stream id from the publisher's msid>"}
//! ```
//!
//! The server replies with `{"cmd":"answer","sdp":"..."}`.

use std::sync::Arc;
use std::time::Duration;

use webrtc_broker::sdp::Capabilities;
use webrtc_broker::{EndpointConfig, LocalEndpoint, ServerConfig, SignalServer};

fn print_usage() {
    eprintln!("Usage: signal_server [PUBLIC_HOST] [--h264]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PORT       listen port (default 8000), also read from ./.env");
    eprintln!("  RUST_LOG   log filter (default info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let h264 = args.iter().any(|a| a == "--h264");
    let public_host = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "127.0.0.1".to_string());

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
                .add_directive("webrtc_broker=debug".parse()?)
                .add_directive("signal_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig::from_env_file(".env");
    let endpoint = LocalEndpoint::new(EndpointConfig::with_host(public_host.clone()));
    let capabilities = if h264 {
        Capabilities::h264()
    } else {
        Capabilities::default()
    };

    println!("Starting signaling broker on {}", config.bind_addr);
    println!("Channel:  ws://{}{}", config.bind_addr, config.channel_path);
    println!("Media:    advertising host {}", public_host);
    println!("Codecs:   {}", if h264 { "opus + H.264" } else { "opus + VP8" });
    println!();

    let server = Arc::new(SignalServer::new(config, endpoint).capabilities(capabilities));

    // Periodic stats
    let stats_server = Arc::clone(&server);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        interval.tick().await;
        loop {
            interval.tick().await;
            let stats = stats_server.stats().await;
            let streams = stats_server.registry().stream_ids().await;
            println!(
                "Stats: connections={} active={} streams={} {:?}",
                stats.total_connections, stats.active_connections, stats.active_streams, streams
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
