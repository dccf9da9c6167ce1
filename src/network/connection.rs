//! Tapped Connection
//!
//! Relays one client connection to the upstream server and decodes the
//! traffic of both directions as it passes.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::conversation::ConnectionId;
use crate::error::Result;
use crate::protocol::Direction;
use crate::stream::StreamSession;
use super::TapEvent;

/// Size of one relay read
const CHUNK_SIZE: usize = 16 * 1024;

/// Handles a single tapped connection
pub struct TapConnection {
    /// Socket to the client
    client: TcpStream,

    /// Socket to the real server
    upstream: TcpStream,

    /// First-pass decoder for this connection
    session: StreamSession,

    /// Where decoded messages go
    events: Sender<TapEvent>,
}

impl TapConnection {
    /// Create a new tapped connection
    ///
    /// Disables Nagle's algorithm on both legs so the relay adds no delay.
    pub fn new(
        client: TcpStream,
        upstream: TcpStream,
        session: StreamSession,
        events: Sender<TapEvent>,
    ) -> Result<Self> {
        client.set_nodelay(true)?;
        upstream.set_nodelay(true)?;

        Ok(Self {
            client,
            upstream,
            session,
            events,
        })
    }

    /// Configure timeouts on both legs
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        for stream in [&self.client, &self.upstream] {
            if read_ms > 0 {
                stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
            }
            if write_ms > 0 {
                stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
            }
        }
        Ok(())
    }

    pub fn connection(&self) -> ConnectionId {
        *self.session.connection()
    }

    /// Relay and decode until both directions are closed
    ///
    /// Each direction is pumped on its own thread. A pump hands every chunk
    /// to the decoder before forwarding it, so a request is always queued
    /// before the server can see it, let alone answer it.
    pub fn handle(mut self) -> Result<()> {
        let connection = self.connection();
        tracing::debug!("Tapping {}", connection);

        let (tx, rx) = channel::unbounded::<(Direction, Vec<u8>)>();

        let to_server = pump(
            Direction::Request,
            self.client.try_clone()?,
            self.upstream.try_clone()?,
            tx.clone(),
        );
        let to_client = pump(
            Direction::Response,
            self.upstream.try_clone()?,
            self.client.try_clone()?,
            tx,
        );

        // Ends once both pumps have dropped their senders
        for (direction, chunk) in rx.iter() {
            match self.session.feed(direction, &chunk) {
                Ok(messages) => {
                    for framed in messages {
                        // Nobody listening is not a reason to stop relaying
                        let _ = self.events.send(TapEvent::Message {
                            connection,
                            message: framed.decoded,
                        });
                    }
                }
                Err(e) => tracing::warn!("{}: {}", connection, e),
            }
        }

        for pump in [to_server, to_client] {
            if pump.join().is_err() {
                tracing::warn!("{}: relay thread panicked", connection);
            }
        }

        let _ = self.events.send(TapEvent::Closed { connection });
        tracing::debug!("Connection {} finished", connection);
        Ok(())
    }
}

/// Copy `from` into `to`, reporting every chunk on `tx` first
fn pump(
    direction: Direction,
    mut from: TcpStream,
    mut to: TcpStream,
    tx: Sender<(Direction, Vec<u8>)>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match from.read(&mut buf) {
                Ok(0) => {
                    // Propagate the half-close to the other side
                    let _ = to.shutdown(Shutdown::Write);
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    match e.kind() {
                        ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                            tracing::debug!("{} side idle timeout", direction);
                        }
                        _ => tracing::debug!("{} side read failed: {}", direction, e),
                    }
                    let _ = from.shutdown(Shutdown::Both);
                    let _ = to.shutdown(Shutdown::Both);
                    break;
                }
            };

            tracing::trace!("{} chunk of {} bytes", direction, n);
            let _ = tx.send((direction, buf[..n].to_vec()));

            if let Err(e) = to.write_all(&buf[..n]) {
                tracing::debug!("{} side write failed: {}", direction, e);
                let _ = from.shutdown(Shutdown::Both);
                let _ = to.shutdown(Shutdown::Both);
                break;
            }
        }
    })
}
