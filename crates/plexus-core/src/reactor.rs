//! Reactor contract
//!
//! A reactor handles inbound messages on one or more channels. The switch calls
//! `get_channels` when the reactor is registered. When a peer joins, `init_peer` runs
//! before the peer starts and `add_peer` after it started; `remove_peer` runs when the
//! peer stops. `receive` is called for every message on a channel the reactor owns.
//!
//! Every hook has a no-op default. Lifecycle, mode and queue access default to the
//! embedded [`BaseReactor`], so a concrete reactor implements `base()` and overrides
//! only what it cares about.

use std::sync::{Arc, Weak};

use crate::base::{BaseReactor, RecvQueue};
use crate::channel::ChannelDescriptor;
use crate::errors::ReactorResult;
use crate::peer::{Peer, RemovalReason};
use crate::service::QuitSignal;
use crate::types::{ChannelId, PeerId};

// ----------------------------------------------------------------------------
// Switch Handle
// ----------------------------------------------------------------------------

/// The orchestrator surface reactors may call back into
pub trait SwitchHandle: Send + Sync {
    /// Snapshot of the currently connected peers
    fn peers(&self) -> Vec<Arc<dyn Peer>>;

    fn num_peers(&self) -> usize {
        self.peers().len()
    }

    /// Disconnect a peer because of an error it caused
    fn stop_peer_for_error(&self, peer_id: PeerId, reason: RemovalReason);

    /// Try to send `payload` on `channel_id` to every peer; returns how many accepted it
    fn broadcast(&self, channel_id: ChannelId, payload: &[u8]) -> usize;
}

// ----------------------------------------------------------------------------
// Reactor Trait
// ----------------------------------------------------------------------------

/// Pluggable handler of peer lifecycle events and channel messages
pub trait Reactor: Send + Sync + 'static {
    /// The embedded base providing lifecycle, queue and switch wiring
    fn base(&self) -> &BaseReactor;

    /// Channels this reactor wants routed to it.
    ///
    /// Queried once at registration; must be side-effect free. Each id must be unique
    /// across all reactors of one switch.
    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        Vec::new()
    }

    /// Called before `peer` is started; returns the (possibly decorated) peer.
    ///
    /// The switch calls neither `add_peer` nor `remove_peer` if the peer then fails to
    /// start, so state kept in the reactor itself for this peer would never be cleaned
    /// up. Attach it to the peer with [`Peer::set`] instead.
    fn init_peer(&self, peer: Arc<dyn Peer>) -> Arc<dyn Peer> {
        peer
    }

    /// Called after `peer` started successfully. Must not block indefinitely.
    fn add_peer(&self, _peer: &Arc<dyn Peer>) {}

    /// Called when `peer` stops for any reason. Releases per-peer resources.
    fn remove_peer(&self, _peer: &Arc<dyn Peer>, _reason: &RemovalReason) {}

    /// Handle one message. `payload` is never empty and is only valid for the
    /// duration of the call.
    fn receive(&self, _channel_id: ChannelId, _peer: &Arc<dyn Peer>, _payload: &[u8]) {}

    /// Runs while the reactor starts, before the receive routine is spawned
    fn on_start(&self) -> ReactorResult<()> {
        Ok(())
    }

    /// Runs once while the reactor stops, before quit is signalled
    fn on_stop(&self) {}

    fn name(&self) -> &str {
        self.base().name()
    }

    fn start(&self) -> ReactorResult<()> {
        self.base().start()
    }

    fn stop(&self) -> ReactorResult<()> {
        self.base().stop()
    }

    fn is_running(&self) -> bool {
        self.base().is_running()
    }

    fn quit(&self) -> QuitSignal {
        self.base().quit()
    }

    fn set_switch(&self, switch: Weak<dyn SwitchHandle>) {
        self.base().set_switch(switch)
    }

    /// Whether messages must be delivered through [`Reactor::recv_queue`]
    fn is_async(&self) -> bool {
        self.base().is_async()
    }

    /// Producer handle of the receive queue.
    ///
    /// # Panics
    ///
    /// Panics if the reactor is synchronous.
    fn recv_queue(&self) -> RecvQueue {
        self.base().recv_queue()
    }
}
