//! Connection Handler
//!
//! Runs the per-connection dispatcher loop. Each accepted client gets its
//! own task that owns the socket, the read buffer and the frame parser
//! exclusively; the only shared state it touches is reached through the
//! synchronized keyspace, broker and persistence handles.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! AWAIT_FRAME ──► DECODE ──► EXECUTE ──► REPLY ──► AWAIT_FRAME
//!      │
//!      ├── clean end-of-stream ──► close silently
//!      └── framing error ────────► close, log only
//! ```
//!
//! No partial-command state survives an iteration beyond what the read
//! buffer holds. Command validation failures (unknown name, arity, value
//! types) become error replies and never close the connection; only
//! transport and framing failures do.
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut`. TCP is a stream protocol:
//! a read may carry half a frame or several pipelined frames, and the
//! incremental parser handles both.
//!
//! ## Pub/Sub Delivery
//!
//! A connection that has subscribed owns a delivery mailbox. Between
//! requests the loop waits on the socket *and* the mailbox; pushed
//! channel messages are written to the client as
//! `["message", channel, payload]` arrays, never interleaved inside a
//! command reply.

use crate::commands::{CommandTable, Dispatch, Executor};
use crate::protocol::{extract_command, Frame, FrameError, FrameParser};
use crate::pubsub::ChannelMessage;
use bytes::{Bytes, BytesMut};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted connection and returns its id.
    pub fn connection_opened(&self) -> u64 {
        let id = self.connections_accepted.fetch_add(1, Ordering::Relaxed) + 1;
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        id
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// The delivery mailbox of a subscribed connection.
///
/// The broker holds clones of `sender`; keeping one here guarantees
/// `receiver` stays open for the connection's whole lifetime.
#[derive(Debug)]
struct Mailbox {
    sender: UnboundedSender<ChannelMessage>,
    receiver: UnboundedReceiver<ChannelMessage>,
}

/// One decoded inbound request.
enum Inbound {
    /// A well-formed command: name plus arguments
    Command(Vec<String>),
    /// A well-formed frame whose arguments were not valid UTF-8
    BadEncoding,
}

/// What woke the loop while waiting between requests.
enum Input {
    Pushed(Option<ChannelMessage>),
    Read(std::io::Result<usize>),
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Connection id (for pub/sub registrations)
    id: u64,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Incremental frame parser
    parser: FrameParser,

    /// The command table (shared across connections)
    table: Arc<CommandTable>,

    /// Shared state handlers run against
    executor: Arc<Executor>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Channels this connection is subscribed to
    subscriptions: HashSet<String>,

    /// Delivery mailbox, created on the first SUBSCRIBE
    mailbox: Option<Mailbox>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        table: Arc<CommandTable>,
        executor: Arc<Executor>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        let id = stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            id,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: FrameParser::new(),
            table,
            executor,
            stats,
            subscriptions: HashSet::new(),
            mailbox: None,
        }
    }

    /// Runs the connection to completion.
    ///
    /// Reads requests, executes them and writes replies until the client
    /// disconnects or a framing error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        if !self.subscriptions.is_empty() {
            self.executor.pubsub().unsubscribe_all(self.id);
        }
        self.stats.connection_closed();
        result
    }

    /// The main decode-execute-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Drain every complete request already buffered (pipelining)
            while let Some(inbound) = self.try_parse_request()? {
                match inbound {
                    Inbound::Command(parts) => {
                        self.stats.command_processed();
                        self.handle_request(parts).await?;
                    }
                    Inbound::BadEncoding => {
                        self.send_reply(&Frame::error("ERR invalid argument encoding"))
                            .await?;
                    }
                }
            }

            // Wait for more bytes, or a pushed channel message
            self.wait_for_input().await?;
        }
    }

    /// Attempts to decode one request from the buffer.
    fn try_parse_request(&mut self) -> Result<Option<Inbound>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((frame, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request frame"
                );
                match extract_command(frame) {
                    Ok(parts) => Ok(Some(Inbound::Command(parts))),
                    // The frame itself was well-formed: report and move on
                    Err(FrameError::InvalidUtf8(_)) => Ok(Some(Inbound::BadEncoding)),
                    // Wrong request shape is a framing error
                    Err(e) => {
                        warn!(client = %self.addr, error = %e, "Invalid request shape");
                        Err(ConnectionError::Frame(e))
                    }
                }
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete frame, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Framing error");
                Err(ConnectionError::Frame(e))
            }
        }
    }

    /// Routes one validated request and writes its reply.
    async fn handle_request(&mut self, parts: Vec<String>) -> Result<(), ConnectionError> {
        let reply = match self.table.prepare(&parts) {
            Err(reply) => reply,
            Ok(spec) => match spec.dispatch {
                Dispatch::Store(run) => run(&self.executor, &parts[1..]),
                Dispatch::Subscribe => return self.subscribe(&parts[1..]).await,
                Dispatch::Unsubscribe => return self.unsubscribe(&parts[1..]).await,
            },
        };
        self.send_reply(&reply).await
    }

    /// Registers this connection with each channel, confirming one
    /// channel per reply.
    async fn subscribe(&mut self, channels: &[String]) -> Result<(), ConnectionError> {
        let sender = match self.mailbox.as_ref() {
            Some(mailbox) => mailbox.sender.clone(),
            None => {
                let (sender, receiver) = mpsc::unbounded_channel();
                self.mailbox = Some(Mailbox {
                    sender: sender.clone(),
                    receiver,
                });
                sender
            }
        };

        for channel in channels {
            if self
                .executor
                .pubsub()
                .subscribe(channel, self.id, sender.clone())
            {
                self.subscriptions.insert(channel.clone());
            }
            let reply = Frame::array(vec![
                Frame::bulk(Bytes::from("subscribe")),
                Frame::bulk(Bytes::from(channel.clone())),
                Frame::integer(self.subscriptions.len() as i64),
            ]);
            self.send_reply(&reply).await?;
        }
        Ok(())
    }

    /// Deregisters this connection from each channel, confirming one
    /// channel per reply.
    async fn unsubscribe(&mut self, channels: &[String]) -> Result<(), ConnectionError> {
        for channel in channels {
            self.executor.pubsub().unsubscribe(channel, self.id);
            self.subscriptions.remove(channel);
            let reply = Frame::array(vec![
                Frame::bulk(Bytes::from("unsubscribe")),
                Frame::bulk(Bytes::from(channel.clone())),
                Frame::integer(self.subscriptions.len() as i64),
            ]);
            self.send_reply(&reply).await?;
        }
        Ok(())
    }

    /// Blocks until the socket yields bytes or the mailbox yields a
    /// pushed message, and applies whichever arrived.
    async fn wait_for_input(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let input = match self.mailbox.as_mut() {
            Some(mailbox) => tokio::select! {
                message = mailbox.receiver.recv() => Input::Pushed(message),
                read = self.stream.get_mut().read_buf(&mut self.buffer) => Input::Read(read),
            },
            None => Input::Read(self.stream.get_mut().read_buf(&mut self.buffer).await),
        };

        match input {
            Input::Pushed(Some(message)) => {
                let frame = Frame::array(vec![
                    Frame::bulk(Bytes::from("message")),
                    Frame::bulk(Bytes::from(message.channel)),
                    Frame::bulk(Bytes::from(message.payload)),
                ]);
                self.send_reply(&frame).await
            }
            // We hold a sender clone, so the mailbox cannot close while
            // the connection lives
            Input::Pushed(None) => Ok(()),
            Input::Read(Ok(0)) => {
                if self.buffer.is_empty() {
                    // Clean end-of-stream between frames
                    Err(ConnectionError::ClientDisconnected)
                } else {
                    // The stream ended inside a frame
                    Err(ConnectionError::UnexpectedEof)
                }
            }
            Input::Read(Ok(n)) => {
                self.stats.bytes_read(n);
                trace!(client = %self.addr, bytes = n, "Read data");
                Ok(())
            }
            Input::Read(Err(e)) => Err(e.into()),
        }
    }

    /// Writes one reply frame to the client.
    async fn send_reply(&mut self, reply: &Frame) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent reply"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error (malformed frame or wrong request shape)
    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial frame)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection to completion.
///
/// Convenience wrapper that builds a [`ConnectionHandler`] and runs it;
/// expected terminations are swallowed here so the accept loop can just
/// spawn and forget.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    table: Arc<CommandTable>,
    executor: Arc<Executor>,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, table, executor, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
