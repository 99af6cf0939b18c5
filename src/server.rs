//! Server implementation.
//!
//! Provides an async `run` function that listens for inbound connections,
//! spawning a task per connection. When started as a follower, the
//! replication handshake runs first and the leader's command stream is
//! applied by its own task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::cmd;
use crate::config::ServerConfig;
use crate::frame::Decoded;
use crate::replication::follower;
use crate::session::Session;
use crate::state::ServerState;
use crate::{Connection, Error, LResult, Shutdown};

/// Server listener state. Created in the `run` call. It includes a `run`
/// method which performs the TCP listening and initialization of
/// per-connection state.
#[derive(Debug)]
struct Listener {
    state: ServerState,
    listener: TcpListener,
    /// Limit the max number of connections.
    ///
    /// A permit is acquired before accepting a connection and returned when
    /// the handler is dropped.
    limit_connections: Arc<Semaphore>,
    /// Broadcasts a shutdown signal to all active connections.
    notify_shutdown: broadcast::Sender<()>,
    /// Each handler holds a clone; the receiver sees `None` once every
    /// handler has finished.
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Per-connection handler. Reads requests from `connection` and applies the
/// commands to the shared state. Once the connection became a replica link,
/// propagated writes are interleaved with the replies.
#[derive(Debug)]
struct Handler {
    state: ServerState,
    connection: Connection<TcpStream>,
    session: Session,
    shutdown: Shutdown,
    _shutdown_complete: mpsc::Sender<()>,
}

enum Event {
    Request(Decoded),
    Propagated(bytes::Bytes),
}

/// Run the server.
///
/// Accepts connections from the supplied listener. For each inbound
/// connection, a task is spawned to handle that connection. The server runs
/// until the `shutdown` future completes, at which point the server shuts
/// down gracefully.
///
/// With `config.replicaof` set, the replication handshake with the leader is
/// performed before any connection is accepted; a failed handshake is
/// returned as [`Error::Handshake`] and nothing is served.
pub async fn run(listener: TcpListener, config: ServerConfig, shutdown: impl Future) -> LResult<()> {
    let state = ServerState::new(config.replicaof.clone());

    let upstream = start_follower(&state, &listener, config.handshake_timeout).await?;

    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let mut server = Listener {
        state,
        listener,
        limit_connections: Arc::new(Semaphore::new(config.max_connections)),
        notify_shutdown,
        shutdown_complete_tx,
    };

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!(cause = %err, "failed to accept");
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }

    if let Some(upstream) = upstream {
        upstream.abort();
    }

    let Listener {
        notify_shutdown,
        shutdown_complete_tx,
        ..
    } = server;

    // Dropping the sender notifies every handler subscribed to it.
    drop(notify_shutdown);
    drop(shutdown_complete_tx);

    // Wait for all active connections to finish processing.
    let _ = shutdown_complete_rx.recv().await;

    Ok(())
}

async fn start_follower(
    state: &ServerState,
    listener: &TcpListener,
    limit: Duration,
) -> LResult<Option<JoinHandle<()>>> {
    let Some(follower) = state.follower() else {
        return Ok(None);
    };
    let own_port = listener.local_addr()?.port();
    info!(leader = %follower.leader(), own_port, "replicating");

    let link = follower::handshake(follower, own_port, limit).await?;
    Ok(Some(tokio::spawn(follower::follow(state.clone(), link))))
}

impl Listener {
    async fn run(&mut self) -> LResult<()> {
        info!(role = self.state.role().as_str(), "accepting inbound connections");

        loop {
            let permit = self
                .limit_connections
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Io(std::io::Error::other("connection limiter closed")))?;

            let socket = self.accept().await?;
            if let Ok(peer) = socket.peer_addr() {
                debug!(%peer, "accepted connection");
            }

            let mut handler = Handler {
                state: self.state.clone(),
                connection: Connection::new(socket),
                session: Session::client(),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!(cause = %err, "connection error");
                }
                drop(permit);
            });
        }
    }

    /// Accept an inbound connection.
    ///
    /// Errors are handled by backing off and retrying. An exponential backoff
    /// strategy is used. After the first failure, the task waits for 1 second.
    /// After the second failure, the task waits for 2 seconds. Each subsequent
    /// failure doubles the wait time. If accepting fails on the 6th try after
    /// waiting for 64 seconds, then this function returns with an error.
    async fn accept(&mut self) -> LResult<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > 64 {
                        return Err(err.into());
                    }
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

impl Handler {
    /// Process a single connection.
    ///
    /// Request frames are read from the socket and dispatched; every reply is
    /// written back in order. Errors of a single command become error
    /// replies, only I/O and framing errors end the connection.
    #[instrument(skip(self))]
    async fn run(&mut self) -> LResult<()> {
        while !self.shutdown.is_shutdown() {
            let event = tokio::select! {
                res = self.connection.read_decoded() => match res? {
                    Some(decoded) => Event::Request(decoded),
                    // the peer closed the socket
                    None => return Ok(()),
                },
                Some(bytes) = self.session.next_propagated() => Event::Propagated(bytes),
                _ = self.shutdown.recv() => return Ok(()),
            };

            match event {
                Event::Request(Decoded { frame, raw }) => {
                    let replies = cmd::dispatch(&self.state, &mut self.session, frame, raw).await;
                    for reply in &replies {
                        self.connection.write_frame(reply).await?;
                    }
                }
                Event::Propagated(bytes) => self.connection.write_raw(&bytes).await?,
            }
        }

        Ok(())
    }
}
