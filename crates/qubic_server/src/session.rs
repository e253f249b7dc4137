//! One connected player.
//!
//! A session is split in two. The [`Session`] handle lives in the server's
//! roster and queues outbound messages. The [`SessionReader`] is owned by
//! that connection's task and yields inbound messages. A dedicated writer
//! task drains the queue onto the socket, so a slow or dead peer never stalls
//! whoever is broadcasting. The queue is bounded: a peer that lets it fill up
//! is evicted instead of buffering without limit.

use crate::ServerError;
use crate::protocol::{ClientMessage, ServerMessage, decode, encode, read_frame, write_frame};
use derive_getters::Getters;
use qubic::Seat;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Notify;
use tokio::sync::mpsc::{Receiver, Sender, channel, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Messages a session may have queued before its peer counts as stalled.
pub const OUTBOUND_CAPACITY: usize = 32;

/// Unique, never reused identifier of a connection.
///
/// Seats can repeat across connections, so the roster is keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{_0}")]
pub struct ConnectionId(pub u64);

/// Roster handle for a connected player.
#[derive(Debug, Getters)]
pub struct Session {
    /// Connection identifier.
    id: ConnectionId,
    /// Seat assigned on accept.
    seat: Seat,
    /// Remote address.
    peer: SocketAddr,
    #[getter(skip)]
    outbound: Sender<ServerMessage>,
    #[getter(skip)]
    writer: JoinHandle<()>,
    #[getter(skip)]
    evicted: Arc<Notify>,
}

impl Session {
    /// Creates the session and spawns its writer task on `writer`.
    ///
    /// The writer task ends, closing the write half, once the handle is
    /// dropped, a write fails, or the peer is evicted.
    #[instrument(skip(writer))]
    pub fn spawn<W>(id: ConnectionId, seat: Seat, peer: SocketAddr, writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, queue) = channel(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(write_loop(id, writer, queue));
        Self {
            id,
            seat,
            peer,
            outbound,
            writer,
            evicted: Arc::new(Notify::new()),
        }
    }

    /// Queues a message for the peer without waiting.
    ///
    /// Best-effort: if the writer has already stopped the message is dropped
    /// and only logged. If the queue is full the peer has stopped reading; its
    /// writer is aborted and the session loop is told to end the connection.
    pub fn send(&self, message: ServerMessage) {
        match self.outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection = %self.id, seat = %self.seat, "Peer stopped reading, evicting");
                self.writer.abort();
                self.evicted.notify_one();
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %self.id, seat = %self.seat, "Writer closed, message dropped");
            }
        }
    }

    /// Signal fired once this peer has been evicted for not reading.
    ///
    /// The permit is kept until awaited, so an eviction that happens before
    /// anyone waits is not lost.
    pub fn eviction(&self) -> Arc<Notify> {
        Arc::clone(&self.evicted)
    }
}

/// Drains a session's queue onto its socket.
async fn write_loop<W>(
    id: ConnectionId,
    mut writer: W,
    mut queue: Receiver<ServerMessage>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = queue.recv().await {
        let sent = match encode(&message) {
            Ok(frame) => write_frame(&mut writer, &frame).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!(connection = %id, error = %e, "Failed to write to peer");
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(connection = %id, error = %e, "Shutdown of write half failed");
    }
}

/// Inbound half of a session.
#[derive(Debug)]
pub struct SessionReader<R> {
    id: ConnectionId,
    reader: BufReader<R>,
}

impl<R> SessionReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps the read half of a connection.
    pub fn new(id: ConnectionId, reader: R) -> Self {
        Self {
            id,
            reader: BufReader::new(reader),
        }
    }

    /// Waits for the next message.
    ///
    /// `Ok(None)` means the peer closed the stream. After
    /// [`ServerError::Malformed`] or [`ServerError::FrameTooLarge`] the stream
    /// is still usable; any other error means the connection is gone.
    pub async fn recv(&mut self) -> Result<Option<ClientMessage>, ServerError> {
        match read_frame(&mut self.reader).await? {
            Some(frame) => {
                let message = decode(&frame)?;
                debug!(connection = %self.id, ?message, "Received message");
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }
}
