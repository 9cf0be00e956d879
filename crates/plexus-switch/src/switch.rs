//! Switch
//!
//! Owns the reactor registry and the peer table, and is the only caller of reactor
//! hooks. Reactors are registered before start; each channel id belongs to exactly
//! one reactor. Peers go through `init_peer` on every reactor, are started, and only
//! then reach `add_peer`. Inbound messages are routed by channel: synchronous reactors
//! receive in-line on the caller's task, asynchronous ones through their queue.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use plexus_core::{
    BaseService, BufferedMessage, ChannelDescriptor, ChannelId, LifecycleState, Peer, PeerId,
    Reactor, ReactorError, RemovalReason, SwitchHandle,
};
use tracing::{debug, error, info, warn};

use crate::config::SwitchConfig;
use crate::error::{SwitchError, SwitchResult};

// ----------------------------------------------------------------------------
// Registry Entries
// ----------------------------------------------------------------------------

struct RegisteredReactor {
    name: String,
    reactor: Arc<dyn Reactor>,
    channels: Vec<ChannelDescriptor>,
}

#[derive(Clone)]
struct Route {
    reactor_name: String,
    reactor: Arc<dyn Reactor>,
    max_message_size: usize,
}

// ----------------------------------------------------------------------------
// Switch
// ----------------------------------------------------------------------------

/// In-process orchestrator of reactors and peers
pub struct Switch {
    config: SwitchConfig,
    service: BaseService,
    me: Weak<Switch>,
    reactors: RwLock<Vec<RegisteredReactor>>,
    routes: RwLock<HashMap<ChannelId, Route>>,
    peers: DashMap<PeerId, Arc<dyn Peer>>,
    /// Connected plus in-flight peers, bounded by `max_peers`
    peer_slots: AtomicUsize,
}

impl Switch {
    /// Create a switch with a validated configuration
    pub fn new(config: SwitchConfig) -> SwitchResult<Arc<Self>> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a switch with [`SwitchConfig::testing`]
    pub fn for_testing() -> Arc<Self> {
        Self::build(SwitchConfig::testing())
    }

    fn build(config: SwitchConfig) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Switch>| Switch {
            config,
            service: BaseService::new("switch"),
            me: me.clone(),
            reactors: RwLock::new(Vec::new()),
            routes: RwLock::new(HashMap::new()),
            peers: DashMap::new(),
            peer_slots: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.service.state()
    }

    pub fn is_running(&self) -> bool {
        self.service.is_running()
    }

    // ------------------------------------------------------------------------
    // Reactor Registry
    // ------------------------------------------------------------------------

    /// Register `reactor` under `name`
    ///
    /// Reactors can only be added before the switch starts. The reactor's channels are
    /// queried exactly once, here; any id already owned by another reactor (or listed
    /// twice by this one) rejects the whole registration.
    pub fn add_reactor(
        &self,
        name: impl Into<String>,
        reactor: Arc<dyn Reactor>,
    ) -> SwitchResult<()> {
        let name = name.into();
        if self.service.state() != LifecycleState::Created {
            return Err(SwitchError::AlreadyRunning);
        }

        let channels = reactor.get_channels();

        let mut reactors = write(&self.reactors);
        let mut routes = write(&self.routes);

        if reactors.iter().any(|registered| registered.name == name) {
            warn!(reactor = %name, "Rejected duplicate reactor registration");
            return Err(SwitchError::DuplicateReactor { name });
        }

        let mut claimed = HashSet::new();
        for descriptor in &channels {
            let owner = match routes.get(&descriptor.id) {
                Some(route) => Some(route.reactor_name.clone()),
                None if !claimed.insert(descriptor.id) => Some(name.clone()),
                None => None,
            };
            if let Some(owner) = owner {
                warn!(
                    reactor = %name,
                    channel = %descriptor.id,
                    owner = %owner,
                    "Rejected reactor with conflicting channel"
                );
                return Err(SwitchError::DuplicateChannel {
                    channel_id: descriptor.id,
                    owner,
                    requested_by: name,
                });
            }
        }

        for descriptor in &channels {
            routes.insert(
                descriptor.id,
                Route {
                    reactor_name: name.clone(),
                    reactor: reactor.clone(),
                    max_message_size: descriptor.recv_message_capacity,
                },
            );
        }

        let handle: Weak<dyn SwitchHandle> = self.me.clone();
        reactor.set_switch(handle);

        info!(
            reactor = %name,
            channels = channels.len(),
            asynchronous = reactor.is_async(),
            "Reactor registered"
        );
        reactors.push(RegisteredReactor {
            name,
            reactor,
            channels,
        });
        Ok(())
    }

    /// Reactor registered under `name`
    pub fn reactor(&self, name: &str) -> Option<Arc<dyn Reactor>> {
        read(&self.reactors)
            .iter()
            .find(|registered| registered.name == name)
            .map(|registered| registered.reactor.clone())
    }

    /// Names of all registered reactors, in registration order
    pub fn reactor_names(&self) -> Vec<String> {
        read(&self.reactors)
            .iter()
            .map(|registered| registered.name.clone())
            .collect()
    }

    /// Reactor owning `channel_id`
    pub fn reactor_for_channel(&self, channel_id: ChannelId) -> Option<Arc<dyn Reactor>> {
        read(&self.routes)
            .get(&channel_id)
            .map(|route| route.reactor.clone())
    }

    /// All registered channel descriptors with the name of their owning reactor
    pub fn channel_descriptors(&self) -> Vec<(String, ChannelDescriptor)> {
        read(&self.reactors)
            .iter()
            .flat_map(|registered| {
                registered
                    .channels
                    .iter()
                    .map(|descriptor| (registered.name.clone(), descriptor.clone()))
            })
            .collect()
    }

    fn reactor_snapshot(&self) -> Vec<Arc<dyn Reactor>> {
        read(&self.reactors)
            .iter()
            .map(|registered| registered.reactor.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Start every reactor in registration order
    ///
    /// If one fails, it and the reactors already started are stopped again and the
    /// switch ends up stopped.
    pub fn start(&self) -> SwitchResult<()> {
        let reactors = self.reactor_snapshot();

        self.service.start(|| {
            for (index, reactor) in reactors.iter().enumerate() {
                if let Err(e) = reactor.start() {
                    error!(
                        reactor = %reactor.name(),
                        error = %e,
                        "Reactor failed to start, rolling back"
                    );
                    for started in reactors[..=index].iter().rev() {
                        if let Err(stop_err) = started.stop() {
                            warn!(
                                reactor = %started.name(),
                                error = %stop_err,
                                "Rollback stop failed"
                            );
                        }
                    }
                    return Err(e);
                }
            }
            Ok(())
        })?;

        info!(reactors = reactors.len(), "Switch started");
        Ok(())
    }

    /// Remove every peer with [`RemovalReason::Shutdown`] and stop every reactor.
    /// Idempotent.
    pub fn stop(&self) -> SwitchResult<()> {
        self.service.stop(|| {
            let peer_ids: Vec<PeerId> = self.peers.iter().map(|entry| *entry.key()).collect();
            for peer_id in peer_ids {
                self.stop_and_remove_peer(peer_id, RemovalReason::Shutdown);
            }

            for reactor in self.reactor_snapshot() {
                if let Err(e) = reactor.stop() {
                    warn!(reactor = %reactor.name(), error = %e, "Reactor failed to stop");
                }
            }
        })?;
        Ok(())
    }

    /// Wait until every asynchronous reactor's receive routine has exited
    pub async fn wait(&self) {
        for reactor in self.reactor_snapshot() {
            reactor.base().wait().await;
        }
    }

    // ------------------------------------------------------------------------
    // Peers
    // ------------------------------------------------------------------------

    /// Connect `peer`: `init_peer` on every reactor, start it, then `add_peer` on
    /// every reactor. Returns the peer as decorated by the reactors.
    ///
    /// If the peer fails to start the error is returned and neither `add_peer` nor
    /// `remove_peer` is called for it. A peer that loses a race with [`Switch::stop`]
    /// is stopped again and `NotRunning` is returned.
    pub fn add_peer(&self, peer: Arc<dyn Peer>) -> SwitchResult<Arc<dyn Peer>> {
        if !self.service.is_running() {
            return Err(SwitchError::NotRunning);
        }

        let peer_id = peer.id();
        if self.peers.contains_key(&peer_id) {
            return Err(SwitchError::DuplicatePeer { peer_id });
        }
        self.reserve_peer_slot(peer_id)?;

        let reactors = self.reactor_snapshot();
        let peer = reactors
            .iter()
            .fold(peer, |peer, reactor| reactor.init_peer(peer));

        if let Err(e) = peer.start() {
            self.release_peer_slot();
            warn!(peer = %peer_id, error = %e, "Peer failed to start");
            return Err(e.into());
        }

        match self.peers.entry(peer_id) {
            Entry::Occupied(_) => {
                self.release_peer_slot();
                peer.stop();
                return Err(SwitchError::DuplicatePeer { peer_id });
            }
            Entry::Vacant(slot) => {
                slot.insert(peer.clone());
            }
        }

        // A stop that ran since the first check has already swept the table
        if !self.service.is_running() {
            if self.peers.remove(&peer_id).is_some() {
                self.release_peer_slot();
            }
            peer.stop();
            debug!(peer = %peer_id, "Switch stopped while adding peer");
            return Err(SwitchError::NotRunning);
        }

        for reactor in &reactors {
            reactor.add_peer(&peer);
        }

        info!(peer = %peer_id, outbound = peer.is_outbound(), "Peer added");
        Ok(peer)
    }

    fn reserve_peer_slot(&self, peer_id: PeerId) -> SwitchResult<()> {
        let max = self.config.max_peers;
        self.peer_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .map(|_| ())
            .map_err(|current| {
                warn!(peer = %peer_id, current, max, "Peer limit reached");
                SwitchError::TooManyPeers { current, max }
            })
    }

    fn release_peer_slot(&self) {
        self.peer_slots.fetch_sub(1, Ordering::AcqRel);
    }

    /// Connected peer with `peer_id`
    pub fn peer(&self, peer_id: &PeerId) -> Option<Arc<dyn Peer>> {
        self.peers.get(peer_id).map(|entry| entry.value().clone())
    }

    pub fn has_peer(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Snapshot of connected peers
    pub fn peers(&self) -> Vec<Arc<dyn Peer>> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    /// Disconnect a peer that misbehaved. Unknown ids are ignored.
    pub fn stop_peer_for_error(&self, peer_id: PeerId, reason: RemovalReason) {
        if self.has_peer(&peer_id) {
            warn!(peer = %peer_id, reason = %reason, "Stopping peer for error");
        }
        self.stop_and_remove_peer(peer_id, reason);
    }

    /// Disconnect a peer in an orderly way. Returns false for unknown ids.
    pub fn stop_peer_gracefully(&self, peer_id: PeerId) -> bool {
        self.stop_and_remove_peer(peer_id, RemovalReason::Graceful)
    }

    fn stop_and_remove_peer(&self, peer_id: PeerId, reason: RemovalReason) -> bool {
        let Some((_, peer)) = self.peers.remove(&peer_id) else {
            debug!(peer = %peer_id, "Ignoring removal of unknown peer");
            return false;
        };
        self.release_peer_slot();

        peer.stop();
        for reactor in self.reactor_snapshot() {
            reactor.remove_peer(&peer, &reason);
        }

        info!(peer = %peer_id, reason = %reason, "Peer removed");
        true
    }

    // ------------------------------------------------------------------------
    // Message Routing
    // ------------------------------------------------------------------------

    /// Route one inbound message to the reactor owning `channel_id`
    ///
    /// Payloads larger than the channel's `recv_message_capacity` are rejected.
    /// Synchronous reactors run `receive` before this returns. For asynchronous ones
    /// the message is enqueued, waiting for room up to the configured enqueue timeout.
    pub async fn deliver(
        &self,
        channel_id: ChannelId,
        peer: &Arc<dyn Peer>,
        payload: Vec<u8>,
    ) -> SwitchResult<()> {
        if !self.service.is_running() {
            return Err(SwitchError::NotRunning);
        }
        if payload.is_empty() {
            return Err(ReactorError::EmptyPayload { channel_id }.into());
        }

        let route = read(&self.routes)
            .get(&channel_id)
            .cloned()
            .ok_or(SwitchError::UnknownChannel { channel_id })?;

        if payload.len() > route.max_message_size {
            warn!(
                reactor = %route.reactor_name,
                channel = %channel_id,
                peer = %peer.id(),
                size = payload.len(),
                "Rejected oversized message"
            );
            return Err(SwitchError::MessageTooLarge {
                channel_id,
                size: payload.len(),
                max: route.max_message_size,
            });
        }

        if !route.reactor.is_async() {
            route.reactor.receive(channel_id, peer, &payload);
            return Ok(());
        }

        let message = BufferedMessage::new(channel_id, peer.clone(), payload)?;
        let queue = route.reactor.recv_queue();

        match self.config.enqueue_timeout() {
            Some(limit) => {
                let sent = tokio::time::timeout(limit, queue.send(message))
                    .await
                    .map_err(|_| {
                        warn!(
                            reactor = %route.reactor_name,
                            channel = %channel_id,
                            peer = %peer.id(),
                            "Enqueue timed out"
                        );
                        SwitchError::EnqueueTimeout {
                            reactor: route.reactor_name.clone(),
                            channel_id,
                            timeout: limit,
                        }
                    })?;
                sent?;
            }
            None => queue.send(message).await?,
        }
        Ok(())
    }

    /// Offer `payload` on `channel_id` to every peer without waiting; returns how many
    /// peers accepted it
    pub fn broadcast(&self, channel_id: ChannelId, payload: &[u8]) -> usize {
        let peers = self.peers();
        let accepted = peers
            .iter()
            .filter(|peer| peer.try_send(channel_id, payload.to_vec()))
            .count();
        debug!(channel = %channel_id, accepted, total = peers.len(), "Broadcast");
        accepted
    }
}

impl SwitchHandle for Switch {
    fn peers(&self) -> Vec<Arc<dyn Peer>> {
        Switch::peers(self)
    }

    fn num_peers(&self) -> usize {
        Switch::num_peers(self)
    }

    fn stop_peer_for_error(&self, peer_id: PeerId, reason: RemovalReason) {
        Switch::stop_peer_for_error(self, peer_id, reason)
    }

    fn broadcast(&self, channel_id: ChannelId, payload: &[u8]) -> usize {
        Switch::broadcast(self, channel_id, payload)
    }
}

impl Drop for Switch {
    fn drop(&mut self) {
        if self.service.is_running() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "Failed to stop switch on drop");
            }
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
