//! The session registry: the one piece of shared mutable state.
//!
//! A process-wide map from peer identity to live session, owned by the
//! gateway server and handed by reference to whoever needs a lookup.
//! Insert happens on accept, removal during session cleanup (including
//! a session removing itself); all three operations are atomic with
//! respect to each other.

use std::collections::HashMap;
use std::sync::Arc;

use jamgate_upstream::UpstreamLink;
use tokio::sync::Mutex;

use crate::{ClientSession, PeerId, PeerLink};

/// All live sessions, keyed by peer identity.
pub struct SessionRegistry<U: UpstreamLink, P: PeerLink> {
    sessions: Mutex<HashMap<PeerId, Arc<ClientSession<U, P>>>>,
}

impl<U: UpstreamLink, P: PeerLink> SessionRegistry<U, P> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a session under its own peer id.
    pub async fn insert(&self, session: Arc<ClientSession<U, P>>) {
        let peer_id = session.peer_id();
        self.sessions.lock().await.insert(peer_id, session);
        tracing::debug!(%peer_id, "session registered");
    }

    /// Looks up the session for a peer. `None` means the peer is not
    /// tracked (never registered, or already cleaned up).
    pub async fn get(
        &self,
        peer_id: PeerId,
    ) -> Option<Arc<ClientSession<U, P>>> {
        self.sessions.lock().await.get(&peer_id).cloned()
    }

    /// Removes and returns a session entry, if present.
    pub async fn remove(
        &self,
        peer_id: PeerId,
    ) -> Option<Arc<ClientSession<U, P>>> {
        self.sessions.lock().await.remove(&peer_id)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether any sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl<U: UpstreamLink, P: PeerLink> Default for SessionRegistry<U, P> {
    fn default() -> Self {
        Self::new()
    }
}
