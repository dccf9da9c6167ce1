//! Iggy Dissect CLI
//!
//! Offline decoding of single messages and text transcripts.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use iggy_dissector::stream::{decode_hex, dissect_transcript, read_transcript, replay};
use iggy_dissector::{Config, ConnectionId, DecodedMessage, Direction, Dissector, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Iggy protocol dissector
#[derive(Parser, Debug)]
#[command(name = "iggy-dissect")]
#[command(about = "Decode Iggy binary protocol traffic")]
#[command(version)]
struct Args {
    /// Server port used to tell requests from responses
    #[arg(short = 'p', long, default_value = "8090")]
    server_port: u16,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one hex-encoded message on a fresh connection
    Decode {
        /// Which side sent the message
        #[arg(short, long, value_enum)]
        direction: DirectionArg,

        /// Message bytes as hex
        payload: String,
    },

    /// Decode a transcript file (`<src> <dst> <hex>` per line)
    Transcript {
        /// Path to the transcript
        file: PathBuf,

        /// Decode everything a second time in reverse order and check
        /// that the output is unchanged
        #[arg(long)]
        replay: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Summary,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    Request,
    Response,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Request => Direction::Request,
            DirectionArg::Response => Direction::Response,
        }
    }
}

fn main() {
    // Initialize tracing/logging (stderr, so stdout stays machine-readable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,iggy_dissector=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder().server_port(args.server_port).build();
    let dissector = Arc::new(Dissector::new(config));

    match args.command {
        Commands::Decode { direction, payload } => {
            let bytes = decode_hex(&payload)?;

            let client = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
            let server = SocketAddr::from((Ipv4Addr::LOCALHOST, args.server_port));
            let message =
                dissector.decode(&ConnectionId::new(client, server), direction.into(), &bytes, 1)?;
            print_message(&message, args.format)?;
        }

        Commands::Transcript { file, replay: verify } => {
            let records = read_transcript(&file)?;
            tracing::info!("{} records read from {}", records.len(), file.display());

            let framed = dissect_transcript(&dissector, &records);
            for message in &framed {
                print_message(&message.decoded, args.format)?;
            }

            if verify {
                let replayed = replay(&dissector, framed.iter().rev())?;
                let mismatches = framed
                    .iter()
                    .rev()
                    .zip(&replayed)
                    .filter(|(first, again)| first.decoded != **again)
                    .count();

                if mismatches == 0 {
                    tracing::info!("Replay of {} messages matched the first pass", framed.len());
                } else {
                    tracing::error!("Replay differed for {} messages", mismatches);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

fn print_message(message: &DecodedMessage, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", message.render_tree()),
        OutputFormat::Summary => println!("#{} {}", message.message_id, message.summary),
        OutputFormat::Json => println!("{}", serde_json::to_string(message)?),
    }
    Ok(())
}
