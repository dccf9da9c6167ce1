//! Iggy Tap Binary
//!
//! Sits between clients and an Iggy server and prints every message it
//! relays.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel::RecvTimeoutError;
use iggy_dissector::network::{register_shutdown_signals, TapEvent, TapServer};
use iggy_dissector::{Config, Dissector};
use tracing_subscriber::{fmt, EnvFilter};

/// Iggy Tap
#[derive(Parser, Debug)]
#[command(name = "iggy-tap")]
#[command(about = "Decoding pass-through proxy for the Iggy protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8091")]
    listen: String,

    /// Upstream Iggy server (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8090")]
    upstream: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Print one JSON object per message instead of a summary line
    #[arg(long)]
    json: bool,

    /// Print the full field tree of every message
    #[arg(long, conflicts_with = "json")]
    tree: bool,
}

/// How often the main loop checks whether the acceptor has stopped
const EVENT_POLL: Duration = Duration::from_millis(200);

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,iggy_dissector=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("Iggy tap v{}", iggy_dissector::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Upstream address: {}", args.upstream);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .upstream_addr(&args.upstream)
        .max_connections(args.max_connections)
        .build();

    let dissector = Arc::new(Dissector::new(config.clone()));
    let mut server = TapServer::new(config, dissector);
    if let Err(e) = server.bind() {
        tracing::error!("Failed to start tap: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = register_shutdown_signals(&server.shutdown_handle()) {
        tracing::error!("Failed to install signal handlers: {}", e);
        std::process::exit(1);
    }
    let events = server.events();

    let acceptor = thread::spawn(move || server.run());

    // Poll so a stopped acceptor is noticed on an idle tap
    while !acceptor.is_finished() {
        match events.recv_timeout(EVENT_POLL) {
            Ok(event) => print_event(event, &args),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    for event in events.try_iter() {
        print_event(event, &args);
    }

    match acceptor.join() {
        Ok(Ok(())) => tracing::info!("Tap stopped"),
        Ok(Err(e)) => {
            tracing::error!("Tap error: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            tracing::error!("Tap thread panicked");
            std::process::exit(1);
        }
    }
}

fn print_event(event: TapEvent, args: &Args) {
    match event {
        TapEvent::Message {
            connection,
            message,
        } => {
            if args.json {
                match serde_json::to_string(&message) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Cannot serialize message: {}", e),
                }
            } else if args.tree {
                println!("[{}]", connection);
                print!("{}", message.render_tree());
            } else {
                println!("[{}] #{} {}", connection, message.message_id, message.summary);
            }
        }
        TapEvent::Closed { connection } => {
            tracing::info!("Connection {} closed", connection);
        }
    }
}
