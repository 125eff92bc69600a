//! The client session: one peer, one upstream, one ordering discipline.
//!
//! Every state transition — queuing, the ready flip, forwarding,
//! teardown — happens under a single per-session mutex. That is the
//! whole concurrency story: within a session there is one writer at a
//! time, and sessions never share state except through the registry.

use std::collections::VecDeque;

use bytes::Bytes;
use jamgate_upstream::{UpstreamEvent, UpstreamLink};
use tokio::sync::{Mutex, mpsc};

use crate::{PeerId, PeerLink, SessionError, SessionRegistry};

/// One browser peer bound to one upstream game-server connection.
///
/// Created when a peer's WebSocket is accepted, before the upstream
/// connect has resolved. Frames the peer sends in that window queue in
/// arrival order; [`mark_ready`] attaches the connected upstream and
/// drains them. Destroyed — exactly once, whoever asks first — on
/// upstream error, upstream close, peer close, or a failed write.
///
/// [`mark_ready`]: ClientSession::mark_ready
pub struct ClientSession<U: UpstreamLink, P: PeerLink> {
    peer_id: PeerId,
    inner: Mutex<SessionInner<U, P>>,
}

struct SessionInner<U, P> {
    peer: P,
    /// Absent until the upstream connect resolves.
    upstream: Option<U>,
    ready: bool,
    /// Frames written before `ready`; drained FIFO, then never touched.
    pending: VecDeque<Bytes>,
    /// Teardown guard: once set, the session only ever drops frames.
    torn_down: bool,
}

impl<U: UpstreamLink, P: PeerLink> ClientSession<U, P> {
    /// Binds a new session to the peer. The upstream arrives later via
    /// [`mark_ready`](Self::mark_ready).
    pub fn new(peer_id: PeerId, peer: P) -> Self {
        Self {
            peer_id,
            inner: Mutex::new(SessionInner {
                peer,
                upstream: None,
                ready: false,
                pending: VecDeque::new(),
                torn_down: false,
            }),
        }
    }

    /// The peer identity this session is registered under.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Whether cleanup has already run.
    pub async fn is_torn_down(&self) -> bool {
        self.inner.lock().await.torn_down
    }

    /// The gateway's sole write entry point: queues the frame until the
    /// upstream is ready, writes it through directly once it is.
    ///
    /// Callers never need to know the readiness state; an error means
    /// the session is beyond saving and should be cleaned up.
    pub async fn enqueue_or_send(
        &self,
        frame: Bytes,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.torn_down {
            return Err(SessionError::TornDown);
        }
        if !inner.ready {
            inner.pending.push_back(frame);
            return Ok(());
        }
        let upstream = inner
            .upstream
            .as_mut()
            .expect("ready session always has an upstream attached");
        upstream.write(frame).await?;
        Ok(())
    }

    /// Attaches the freshly connected upstream and flips the session to
    /// ready, draining queued frames in FIFO order through the same
    /// write path live sends use. Called at most once, after the
    /// upstream connect resolves.
    ///
    /// If the peer vanished while the upstream was still connecting the
    /// incoming connection is destroyed on the spot and
    /// [`SessionError::TornDown`] returned.
    pub async fn mark_ready(&self, mut upstream: U) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.torn_down {
            upstream.destroy();
            return Err(SessionError::TornDown);
        }

        // The lock is held across the whole drain, so no live send can
        // interleave with (or overtake) a queued frame.
        while let Some(frame) = inner.pending.pop_front() {
            if let Err(e) = upstream.write(frame).await {
                upstream.destroy();
                return Err(SessionError::Upstream(e));
            }
        }

        inner.upstream = Some(upstream);
        inner.ready = true;
        tracing::debug!(peer_id = %self.peer_id, "session ready");
        Ok(())
    }

    /// Delivers one decoded upstream frame to the peer, verbatim.
    ///
    /// A frame that arrives after the peer disconnected but before
    /// cleanup completes is silently dropped — never requeued. An
    /// actual delivery failure is unrecoverable and reported.
    pub async fn forward_to_peer(
        &self,
        frame: Bytes,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.torn_down || !inner.peer.is_open() {
            tracing::trace!(
                peer_id = %self.peer_id,
                "dropping upstream frame for closed peer"
            );
            return Ok(());
        }
        inner.peer.forward(frame).await.map_err(|e| {
            tracing::debug!(
                peer_id = %self.peer_id,
                error = %e,
                "peer delivery failed"
            );
            SessionError::PeerGone
        })
    }

    /// Consumes the upstream event stream for this session's lifetime.
    ///
    /// Frames are forwarded to the peer; an error or close from the
    /// upstream is terminal and triggers [`cleanup`](Self::cleanup).
    pub async fn pump_events(
        &self,
        mut events: mpsc::UnboundedReceiver<UpstreamEvent>,
        registry: &SessionRegistry<U, P>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                UpstreamEvent::Frame(frame) => {
                    if self.forward_to_peer(frame).await.is_err() {
                        self.cleanup(registry).await;
                        break;
                    }
                }
                UpstreamEvent::Error(e) => {
                    tracing::warn!(
                        peer_id = %self.peer_id,
                        error = %e,
                        "game server connection failed"
                    );
                    self.cleanup(registry).await;
                    break;
                }
                UpstreamEvent::Closed => {
                    tracing::debug!(
                        peer_id = %self.peer_id,
                        "game server connection closed"
                    );
                    self.cleanup(registry).await;
                    break;
                }
            }
        }
    }

    /// Tears the session down: closes the peer transport, destroys the
    /// upstream connection, drops queued frames, and removes the
    /// registry entry.
    ///
    /// Idempotent — a second call (error event racing a close event,
    /// say) is a no-op. Every step runs even when an earlier one fails;
    /// a peer that is already gone must not keep the upstream socket
    /// alive.
    pub async fn cleanup(&self, registry: &SessionRegistry<U, P>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.torn_down {
                return;
            }
            inner.torn_down = true;

            if inner.peer.is_open() {
                if let Err(e) = inner.peer.close().await {
                    tracing::debug!(
                        peer_id = %self.peer_id,
                        error = %e,
                        "peer close failed"
                    );
                }
            }
            if let Some(upstream) = inner.upstream.as_mut() {
                upstream.destroy();
            }
            inner.pending.clear();
        }
        registry.remove(self.peer_id).await;
        tracing::info!(peer_id = %self.peer_id, "session torn down");
    }
}

// =========================================================================
// Tests
// =========================================================================
