//! Peer capability
//!
//! Reactors never own peers. The switch hands them shared references for the
//! duration of a hook or message and keeps the peer table itself.
//!
//! Per-peer state should be attached to the peer through [`Peer::set`] rather than kept
//! in a map inside the reactor: a peer that fails to start after `init_peer` never
//! reaches `remove_peer`, so reactor-side maps would leak its entry forever.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::errors::ReactorResult;
use crate::types::{ChannelId, PeerId};

/// Opaque per-peer value attached by a reactor
pub type PeerData = Arc<dyn Any + Send + Sync>;

// ----------------------------------------------------------------------------
// Peer Trait
// ----------------------------------------------------------------------------

/// A connected remote node, as seen by reactors
///
/// Outbound traffic goes straight through the peer; the reactor core only carries
/// inbound messages.
#[async_trait::async_trait]
pub trait Peer: Send + Sync + 'static {
    /// Identity of the remote node
    fn id(&self) -> PeerId;

    /// Whether we dialed this peer
    fn is_outbound(&self) -> bool;

    /// Start the peer's connection; called by the switch after `init_peer`
    fn start(&self) -> ReactorResult<()>;

    /// Stop the peer's connection; must be idempotent
    fn stop(&self);

    /// Whether the peer is started and not yet stopped
    fn is_running(&self) -> bool;

    /// Queue `payload` for sending on `channel_id`, waiting for room.
    /// Returns false if the peer is stopped.
    async fn send(&self, channel_id: ChannelId, payload: Vec<u8>) -> bool;

    /// Queue `payload` without waiting. Returns false if the queue is full or the
    /// peer is stopped.
    fn try_send(&self, channel_id: ChannelId, payload: Vec<u8>) -> bool;

    /// Attach a value to this peer under `key`, replacing any previous value
    fn set(&self, key: &str, value: PeerData);

    /// Value previously attached under `key`
    fn get(&self, key: &str) -> Option<PeerData>;
}

impl fmt::Debug for dyn Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id())
            .field("outbound", &self.is_outbound())
            .finish()
    }
}

/// Typed lookup of a value attached with [`Peer::set`]
pub fn peer_data<T: Any + Send + Sync>(peer: &dyn Peer, key: &str) -> Option<Arc<T>> {
    peer.get(key).and_then(|value| value.downcast::<T>().ok())
}

// ----------------------------------------------------------------------------
// Removal Reason
// ----------------------------------------------------------------------------

/// Why a peer was removed; diagnostic only, reactors must not branch on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// Orderly disconnect requested by either side
    Graceful,
    /// Connection or reactor error
    Error(String),
    /// The peer broke the channel protocol
    ProtocolViolation(String),
    /// The switch is shutting down
    Shutdown,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Graceful => write!(f, "graceful disconnect"),
            RemovalReason::Error(reason) => write!(f, "error: {}", reason),
            RemovalReason::ProtocolViolation(reason) => write!(f, "protocol violation: {}", reason),
            RemovalReason::Shutdown => write!(f, "switch shutdown"),
        }
    }
}
