//! Tap Server
//!
//! Accepts client connections, opens a matching upstream connection for
//! each, and hands the pair to a [`TapConnection`] thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::conversation::ConnectionId;
use crate::dissector::Dissector;
use crate::error::{DissectError, Result};
use crate::stream::{MessageIds, StreamSession};
use super::{TapConnection, TapEvent};

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL: Duration = Duration::from_millis(25);

/// Set `shutdown` on SIGINT or SIGTERM
///
/// Pass [`TapServer::shutdown_handle`] to stop the accept loop from a
/// signal.
pub fn register_shutdown_signals(shutdown: &Arc<AtomicBool>) -> Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(shutdown))?;
    Ok(())
}

/// Pass-through proxy that decodes what it relays
///
/// Live traffic is decoded once and never replayed, so each connection's
/// sessions run with history off: an exchange is dropped from the
/// conversation once its response is decoded. Memory per connection is
/// bounded by its outstanding requests.
pub struct TapServer {
    config: Config,
    dissector: Arc<Dissector>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    ids: MessageIds,
    events_tx: Sender<TapEvent>,
    events_rx: Receiver<TapEvent>,
}

impl TapServer {
    /// Create a new tap with the given config and dissector
    pub fn new(config: Config, dissector: Arc<Dissector>) -> Self {
        let (events_tx, events_rx) = channel::unbounded();
        Self {
            config,
            dissector,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            ids: MessageIds::new(),
            events_tx,
            events_rx,
        }
    }

    /// Bind the listen address; returns the actual bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            DissectError::Network(format!("cannot bind {}: {}", self.config.listen_addr, e))
        })?;
        // Non-blocking so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        tracing::info!("Tap listening on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Receiver of decoded traffic; may be cloned freely
    pub fn events(&self) -> Receiver<TapEvent> {
        self.events_rx.clone()
    }

    /// Flag that stops [`TapServer::run`] when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Connections currently being relayed
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Connections already accepted keep running until their peers close.
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(DissectError::Network("listener not bound".to_string())),
        };

        tracing::info!("Relaying to {}", self.config.upstream_addr);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((client, peer)) => {
                    if let Err(e) = self.accept(client, peer) {
                        tracing::warn!("Rejected {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Tap stopped accepting connections");
        Ok(())
    }

    fn accept(&self, client: TcpStream, peer: SocketAddr) -> Result<()> {
        if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
            return Err(DissectError::Network(format!(
                "connection limit {} reached",
                self.config.max_connections
            )));
        }

        // Accepted sockets inherit non-blocking mode on some platforms
        client.set_nonblocking(false)?;

        let upstream = TcpStream::connect(&self.config.upstream_addr).map_err(|e| {
            DissectError::Network(format!(
                "cannot reach upstream {}: {}",
                self.config.upstream_addr, e
            ))
        })?;

        let connection = ConnectionId::new(peer, upstream.peer_addr()?);
        let mut session =
            StreamSession::new(connection, Arc::clone(&self.dissector), self.ids.clone());
        session.set_retain_history(false);
        let mut tapped = TapConnection::new(client, upstream, session, self.events_tx.clone())?;
        tapped.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        let dissector = Arc::clone(&self.dissector);
        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::Relaxed);

        thread::spawn(move || {
            if let Err(e) = tapped.handle() {
                tracing::warn!("{}: {}", connection, e);
            }
            dissector.close_conversation(&connection);
            active.fetch_sub(1, Ordering::Relaxed);
        });

        Ok(())
    }
}
