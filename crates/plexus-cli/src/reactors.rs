//! Demo reactors
//!
//! [`CountingReactor`] checks that every peer's messages arrive in the order the peer
//! sent them; [`EchoReactor`] answers each message on the same channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use plexus_core::{
    peer_data, BaseReactor, ChannelDescriptor, ChannelId, Peer, Reactor, ReactorConfig,
    RemovalReason,
};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub const COUNTER_CHANNEL: ChannelId = ChannelId(0x20);
pub const ECHO_CHANNEL: ChannelId = ChannelId(0x21);

const SEQUENCE_KEY: &str = "counter.next_sequence";
const SEQUENCE_LEN: usize = 8;

// ----------------------------------------------------------------------------
// Counting Reactor
// ----------------------------------------------------------------------------

/// Per-peer state attached by [`CountingReactor::init_peer`]
#[derive(Debug, Default)]
pub struct SequenceTracker {
    next: AtomicU64,
}

impl SequenceTracker {
    /// Sequence number the next message from this peer should carry
    pub fn next(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

/// Counts messages carrying big-endian `u64` sequence numbers and records gaps or
/// reordering per peer
pub struct CountingReactor {
    base: BaseReactor,
    received: AtomicU64,
    order_violations: AtomicU64,
    malformed: AtomicU64,
    progress: Notify,
}

impl CountingReactor {
    pub const NAME: &'static str = "counter";

    pub fn new(config: ReactorConfig) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<CountingReactor>| CountingReactor {
            base: BaseReactor::new(Self::NAME, me.clone(), config),
            received: AtomicU64::new(0),
            order_violations: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            progress: Notify::new(),
        })
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }

    pub fn order_violations(&self) -> u64 {
        self.order_violations.load(Ordering::Acquire)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Acquire)
    }

    /// Wait until at least `expected` messages were counted
    pub async fn wait_for(&self, expected: u64) {
        while self.received() < expected {
            self.progress.notified().await;
        }
    }

    /// Tracker for `peer`, if it went through `init_peer`
    pub fn tracker(peer: &dyn Peer) -> Option<Arc<SequenceTracker>> {
        peer_data::<SequenceTracker>(peer, SEQUENCE_KEY)
    }

    fn disconnect(&self, peer: &Arc<dyn Peer>, reason: &str) {
        self.malformed.fetch_add(1, Ordering::AcqRel);
        if let Some(switch) = self.base.switch() {
            let reason = RemovalReason::ProtocolViolation(reason.to_string());
            switch.stop_peer_for_error(peer.id(), reason);
        }
    }
}

impl Reactor for CountingReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(COUNTER_CHANNEL)
            .with_priority(5)
            .with_send_queue_capacity(100)
            .with_recv_buffer_capacity(SEQUENCE_LEN * 64)
            .with_recv_message_capacity(SEQUENCE_LEN)]
    }

    fn init_peer(&self, peer: Arc<dyn Peer>) -> Arc<dyn Peer> {
        peer.set(SEQUENCE_KEY, Arc::new(SequenceTracker::default()));
        peer
    }

    fn add_peer(&self, peer: &Arc<dyn Peer>) {
        debug!(peer = %peer.id(), "Counting messages from peer");
    }

    fn remove_peer(&self, peer: &Arc<dyn Peer>, reason: &RemovalReason) {
        let next = Self::tracker(peer.as_ref()).map(|tracker| tracker.next());
        debug!(peer = %peer.id(), reason = %reason, next_sequence = ?next, "Peer left counter");
    }

    fn receive(&self, _channel_id: ChannelId, peer: &Arc<dyn Peer>, payload: &[u8]) {
        let Ok(bytes) = <[u8; SEQUENCE_LEN]>::try_from(payload) else {
            warn!(peer = %peer.id(), len = payload.len(), "Malformed sequence message");
            self.disconnect(peer, "sequence message must be 8 bytes");
            return;
        };
        let Some(tracker) = Self::tracker(peer.as_ref()) else {
            warn!(peer = %peer.id(), "Message from peer that was never initialised");
            self.disconnect(peer, "unknown peer");
            return;
        };

        let sequence = u64::from_be_bytes(bytes);
        let expected = tracker.next.swap(sequence.wrapping_add(1), Ordering::AcqRel);
        if sequence != expected {
            self.order_violations.fetch_add(1, Ordering::AcqRel);
            warn!(peer = %peer.id(), expected, sequence, "Out-of-order message");
        }

        self.received.fetch_add(1, Ordering::AcqRel);
        self.progress.notify_one();
    }

    fn on_start(&self) -> plexus_core::ReactorResult<()> {
        info!(asynchronous = self.is_async(), "Counter ready");
        Ok(())
    }

    fn on_stop(&self) {
        info!(
            received = self.received(),
            order_violations = self.order_violations(),
            "Counter stopped"
        );
    }
}

// ----------------------------------------------------------------------------
// Echo Reactor
// ----------------------------------------------------------------------------

/// Synchronous reactor that sends every message straight back to its peer
pub struct EchoReactor {
    base: BaseReactor,
    echoed: AtomicU64,
    dropped: AtomicU64,
}

impl EchoReactor {
    pub const NAME: &'static str = "echo";

    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<EchoReactor>| EchoReactor {
            base: BaseReactor::new(Self::NAME, me.clone(), ReactorConfig::synchronous()),
            echoed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn echoed(&self) -> u64 {
        self.echoed.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }
}

impl Reactor for EchoReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(ECHO_CHANNEL)]
    }

    fn receive(&self, channel_id: ChannelId, peer: &Arc<dyn Peer>, payload: &[u8]) {
        if peer.try_send(channel_id, payload.to_vec()) {
            self.echoed.fetch_add(1, Ordering::AcqRel);
        } else {
            self.dropped.fetch_add(1, Ordering::AcqRel);
            debug!(peer = %peer.id(), "Echo dropped, peer send queue full");
        }
    }
}
