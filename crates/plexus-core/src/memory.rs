//! In-process peer
//!
//! [`MemoryPeer`] implements [`Peer`] without a network connection: outbound sends
//! land in a bounded tokio channel whose receiving end is returned to the caller.
//! The switch tests and the demo CLI connect reactors to these.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{ReactorError, ReactorResult};
use crate::peer::{Peer, PeerData};
use crate::types::{ChannelId, PeerId};

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// A message a reactor sent to a [`MemoryPeer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: ChannelId,
    pub payload: Vec<u8>,
}

/// Peer backed by an in-memory outbound queue
#[derive(Debug)]
pub struct MemoryPeer {
    id: PeerId,
    outbound: bool,
    state: AtomicU8,
    start_failure: Option<String>,
    sender: mpsc::Sender<OutboundMessage>,
    data: Mutex<HashMap<String, PeerData>>,
}

impl MemoryPeer {
    /// Create a peer whose outbound queue holds `send_capacity` messages (at least 1)
    pub fn new(id: PeerId, send_capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(send_capacity.max(1));
        let peer = Self {
            id,
            outbound: false,
            state: AtomicU8::new(CREATED),
            start_failure: None,
            sender,
            data: Mutex::new(HashMap::new()),
        };
        (peer, receiver)
    }

    /// Mark the peer as dialed by us
    pub fn outbound(mut self) -> Self {
        self.outbound = true;
        self
    }

    /// Make [`Peer::start`] fail with `reason`
    pub fn fail_on_start(mut self, reason: impl Into<String>) -> Self {
        self.start_failure = Some(reason.into());
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOPPED
    }

    fn data(&self) -> std::sync::MutexGuard<'_, HashMap<String, PeerData>> {
        self.data
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Peer for MemoryPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn is_outbound(&self) -> bool {
        self.outbound
    }

    fn start(&self) -> ReactorResult<()> {
        if let Some(reason) = &self.start_failure {
            return Err(ReactorError::PeerStartFailed {
                peer_id: self.id,
                reason: reason.clone(),
            });
        }
        self.state
            .compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ReactorError::PeerStartFailed {
                peer_id: self.id,
                reason: "peer already started or stopped".to_string(),
            })
    }

    fn stop(&self) {
        if self.state.swap(STOPPED, Ordering::AcqRel) != STOPPED {
            debug!(peer = %self.id, "Memory peer stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    async fn send(&self, channel_id: ChannelId, payload: Vec<u8>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sender
            .send(OutboundMessage {
                channel_id,
                payload,
            })
            .await
            .is_ok()
    }

    fn try_send(&self, channel_id: ChannelId, payload: Vec<u8>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sender
            .try_send(OutboundMessage {
                channel_id,
                payload,
            })
            .is_ok()
    }

    fn set(&self, key: &str, value: PeerData) {
        self.data().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<PeerData> {
        self.data().get(key).cloned()
    }
}
