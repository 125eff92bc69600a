//! WebSocket adapter for the browser side of a session.

use bytes::Bytes;
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use jamgate_session::PeerLink;
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

/// The write half of an accepted browser WebSocket.
pub type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// [`PeerLink`] over a WebSocket sink.
///
/// Decoded upstream frames go out as binary messages, unmodified. The
/// `open` flag flips on close or on the first failed send; after that
/// the session layer drops frames instead of retrying a dead socket.
pub struct WsPeer {
    sink: WsSink,
    open: bool,
}

impl WsPeer {
    pub fn new(sink: WsSink) -> Self {
        Self { sink, open: true }
    }
}

impl PeerLink for WsPeer {
    type Error = tokio_tungstenite::tungstenite::Error;

    async fn forward(&mut self, frame: Bytes) -> Result<(), Self::Error> {
        match self.sink.send(Message::Binary(frame)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.open = false;
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.open = false;
        self.sink.send(Message::Close(None)).await
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
