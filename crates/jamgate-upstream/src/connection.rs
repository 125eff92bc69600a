//! TLS connection management and the reader task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use jamgate_protocol::FrameCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::UpstreamError;

// The reader/writer plumbing is independent of the concrete stream
// type: TLS in production, in-memory duplex in tests.
type BoxedReader = Box<dyn AsyncRead + Send + Sync + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Sync + Unpin>;

/// Where a connection is in its life.
///
/// `Closed` is terminal: the same instance never connects again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Freshly built, no socket yet.
    Idle,
    /// TCP/TLS establishment in progress.
    Connecting,
    /// Socket open, frames flowing.
    Connected,
    /// Socket gone, by close, error, or destroy.
    Closed,
}

/// What the reader side reports to the connection's owner.
#[derive(Debug)]
pub enum UpstreamEvent {
    /// One decoded frame, delivered in byte-stream order.
    Frame(Bytes),
    /// The socket or decode path failed. Terminal; `Closed` may follow.
    Error(std::io::Error),
    /// The socket closed — remote close, local destroy, or after an
    /// error. Emitted exactly once per connection lifetime.
    Closed,
}

/// Keeps the reader task and its event channel together so destroy can
/// tear down the task and still honor the once-only `Closed` event.
struct ReaderHandle {
    task: JoinHandle<()>,
    events: mpsc::UnboundedSender<UpstreamEvent>,
    closed: Arc<AtomicBool>,
}

/// One TLS socket to the game server.
///
/// The connection owns the write half directly; the read half lives in
/// a spawned task that decodes frames through [`FrameCodec`] and pushes
/// [`UpstreamEvent`]s to the receiver handed out by [`connect`].
///
/// [`connect`]: UpstreamConnection::connect
pub struct UpstreamConnection {
    host: String,
    port: u16,
    state: ConnectionState,
    writer: Option<FramedWrite<BoxedWriter, FrameCodec>>,
    reader: Option<ReaderHandle>,
}

impl UpstreamConnection {
    /// Builds an idle connection aimed at the given endpoint. No I/O
    /// happens until [`connect`](Self::connect).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            state: ConnectionState::Idle,
            writer: None,
            reader: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Opens the TCP + TLS session and starts decoding inbound frames.
    ///
    /// Any existing socket is destroyed first — a connection holds at
    /// most one live socket. On failure the partially-built socket is
    /// released and the connection is `Closed`.
    ///
    /// Returns the receiver for this socket's [`UpstreamEvent`]s.
    pub async fn connect(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<UpstreamEvent>, UpstreamError> {
        self.release_socket();
        self.state = ConnectionState::Connecting;

        match self.open_tls().await {
            Ok(stream) => {
                tracing::debug!(
                    host = %self.host,
                    port = self.port,
                    "connected to game server"
                );
                self.state = ConnectionState::Connected;
                Ok(self.wire(stream))
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    async fn open_tls(
        &self,
    ) -> Result<tokio_native_tls::TlsStream<TcpStream>, UpstreamError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(UpstreamError::Connect)?;

        // The server's certificate is not publicly trusted; the
        // deployment pins the endpoint by host. Verification stays off.
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(UpstreamError::Tls)?;

        tokio_native_tls::TlsConnector::from(connector)
            .connect(&self.host, tcp)
            .await
            .map_err(UpstreamError::Tls)
    }

    /// Splits the socket, spawns the reader task, and keeps the framed
    /// write half.
    fn wire<S>(&mut self, io: S) -> mpsc::UnboundedReceiver<UpstreamEvent>
    where
        S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let reader: BoxedReader = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(read_loop(
            FramedRead::new(reader, FrameCodec),
            tx.clone(),
            Arc::clone(&closed),
        ));

        self.writer = Some(FramedWrite::new(writer, FrameCodec));
        self.reader = Some(ReaderHandle { task, events: tx, closed });
        rx
    }

    /// Writes one frame, appending the delimiter if the frame lacks one.
    ///
    /// Resolves once the transport has accepted the bytes — the flush
    /// await is the single backpressure point in the write path. Fails
    /// immediately with [`UpstreamError::NotConnected`] when no socket
    /// is open; a mid-flight failure closes the connection.
    pub async fn write(&mut self, frame: Bytes) -> Result<(), UpstreamError> {
        if self.state != ConnectionState::Connected {
            return Err(UpstreamError::NotConnected);
        }
        let writer =
            self.writer.as_mut().ok_or(UpstreamError::NotConnected)?;

        match writer.send(frame).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.destroy();
                Err(UpstreamError::Write(e))
            }
        }
    }

    /// Forcibly closes the socket, if any, and marks the connection
    /// `Closed`. Safe to call repeatedly and from any state.
    pub fn destroy(&mut self) {
        self.release_socket();
        self.state = ConnectionState::Closed;
    }

    /// Drops the write half and stops the reader task, emitting the
    /// once-only `Closed` event if the reader had not already.
    fn release_socket(&mut self) {
        self.writer = None;
        if let Some(reader) = self.reader.take() {
            reader.task.abort();
            emit_closed(&reader.events, &reader.closed);
        }
    }
}

impl Drop for UpstreamConnection {
    fn drop(&mut self) {
        self.release_socket();
    }
}

/// Decodes inbound frames until the socket ends, forwarding each as an
/// event. An unterminated tail is discarded by the codec at EOF.
async fn read_loop(
    mut frames: FramedRead<BoxedReader, FrameCodec>,
    events: mpsc::UnboundedSender<UpstreamEvent>,
    closed: Arc<AtomicBool>,
) {
    while let Some(next) = frames.next().await {
        match next {
            Ok(frame) => {
                if events.send(UpstreamEvent::Frame(frame)).is_err() {
                    // Receiver gone; nobody is listening any more.
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "upstream read failed");
                let _ = events.send(UpstreamEvent::Error(e));
                break;
            }
        }
    }
    emit_closed(&events, &closed);
}

/// Sends `Closed` unless it has already been sent for this socket.
fn emit_closed(
    events: &mpsc::UnboundedSender<UpstreamEvent>,
    closed: &AtomicBool,
) {
    if !closed.swap(true, Ordering::SeqCst) {
        let _ = events.send(UpstreamEvent::Closed);
    }
}

// =========================================================================
// Tests
// =========================================================================
