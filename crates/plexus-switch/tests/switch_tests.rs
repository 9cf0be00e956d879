//! Switch Integration Tests
//!
//! Drives real reactors through the switch: registration rules, peer lifecycle
//! ordering, routing to synchronous and asynchronous reactors, and shutdown.

use plexus_core::{peer_data, OutboundMessage, ReactorResult};
use plexus_switch::{
    BaseReactor, ChannelDescriptor, ChannelId, MemoryPeer, Peer, PeerId, Reactor, ReactorConfig,
    ReactorError, RemovalReason, Switch, SwitchConfig, SwitchError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

const WAIT: Duration = Duration::from_secs(2);
const INITIALIZED_KEY: &str = "tracking.initialized";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Init(PeerId),
    Add(PeerId),
    Remove(PeerId, RemovalReason),
    Receive(ChannelId, PeerId, Vec<u8>),
}

struct TrackingReactor {
    base: BaseReactor,
    channels: Vec<ChannelDescriptor>,
    events: Mutex<Vec<Event>>,
    received: mpsc::UnboundedSender<Vec<u8>>,
    fail_start: bool,
}

impl TrackingReactor {
    fn new(
        name: &str,
        channels: &[u8],
        config: ReactorConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        Self::build(name, channels, config, false)
    }

    fn failing(name: &str, channels: &[u8], config: ReactorConfig) -> Arc<Self> {
        Self::build(name, channels, config, true).0
    }

    fn build(
        name: &str,
        channels: &[u8],
        config: ReactorConfig,
        fail_start: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (received, received_rx) = mpsc::unbounded_channel();
        let channels = channels.iter().map(|id| ChannelDescriptor::new(*id)).collect();
        let reactor = Arc::new_cyclic(|me: &Weak<TrackingReactor>| TrackingReactor {
            base: BaseReactor::new(name, me.clone(), config),
            channels,
            events: Mutex::new(Vec::new()),
            received,
            fail_start,
        });
        (reactor, received_rx)
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reactor for TrackingReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        self.channels.clone()
    }

    fn init_peer(&self, peer: Arc<dyn Peer>) -> Arc<dyn Peer> {
        self.record(Event::Init(peer.id()));
        peer.set(INITIALIZED_KEY, Arc::new(true));
        peer
    }

    fn add_peer(&self, peer: &Arc<dyn Peer>) {
        self.record(Event::Add(peer.id()));
    }

    fn remove_peer(&self, peer: &Arc<dyn Peer>, reason: &RemovalReason) {
        self.record(Event::Remove(peer.id(), reason.clone()));
    }

    fn receive(&self, channel_id: ChannelId, peer: &Arc<dyn Peer>, payload: &[u8]) {
        self.record(Event::Receive(channel_id, peer.id(), payload.to_vec()));
        if payload == b"bad" {
            if let Some(switch) = self.base().switch() {
                switch.stop_peer_for_error(
                    peer.id(),
                    RemovalReason::ProtocolViolation("bad payload".to_string()),
                );
            }
        }
        let _ = self.received.send(payload.to_vec());
    }

    fn on_start(&self) -> ReactorResult<()> {
        if self.fail_start {
            return Err(ReactorError::hook(self.name(), "refusing to start"));
        }
        Ok(())
    }
}

fn memory_peer(id: u64) -> (Arc<dyn Peer>, mpsc::Receiver<OutboundMessage>) {
    let (peer, outbound) = MemoryPeer::new(PeerId::from_index(id), 16);
    (Arc::new(peer), outbound)
}

async fn collect(received: &mut mpsc::UnboundedReceiver<Vec<u8>>, count: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(
            timeout(WAIT, received.recv())
                .await
                .expect("reactor should receive in time")
                .expect("reactor sender dropped"),
        );
    }
    out
}

// ----------------------------------------------------------------------------
// Registration
// ----------------------------------------------------------------------------

#[test]
fn test_channel_ids_must_be_unique_across_reactors() {
    let switch = Switch::for_testing();
    let (consensus, _) =
        TrackingReactor::new("consensus", &[0x20, 0x21], ReactorConfig::synchronous());
    let (mempool, _) =
        TrackingReactor::new("mempool", &[0x30, 0x21], ReactorConfig::synchronous());

    switch.add_reactor("consensus", consensus).unwrap();
    let err = switch.add_reactor("mempool", mempool).unwrap_err();

    match err {
        SwitchError::DuplicateChannel {
            channel_id,
            owner,
            requested_by,
        } => {
            assert_eq!(channel_id, ChannelId::new(0x21));
            assert_eq!(owner, "consensus");
            assert_eq!(requested_by, "mempool");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The rejected reactor claimed nothing
    assert!(switch.reactor_for_channel(ChannelId::new(0x30)).is_none());
    assert_eq!(switch.reactor_names(), vec!["consensus".to_string()]);
}

#[test]
fn test_reactor_listing_a_channel_twice_is_rejected() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("twice", &[0x40, 0x40], ReactorConfig::synchronous());

    assert!(matches!(
        switch.add_reactor("twice", reactor),
        Err(SwitchError::DuplicateChannel { .. })
    ));
}

#[test]
fn test_duplicate_reactor_name_and_late_registration_are_rejected() {
    let switch = Switch::for_testing();
    let (first, _) = TrackingReactor::new("pex", &[0x00], ReactorConfig::synchronous());
    let (second, _) = TrackingReactor::new("pex", &[0x01], ReactorConfig::synchronous());
    let (late, _) = TrackingReactor::new("late", &[0x02], ReactorConfig::synchronous());

    switch.add_reactor("pex", first).unwrap();
    assert!(matches!(
        switch.add_reactor("pex", second),
        Err(SwitchError::DuplicateReactor { .. })
    ));

    switch.start().unwrap();
    assert!(matches!(
        switch.add_reactor("late", late),
        Err(SwitchError::AlreadyRunning)
    ));
    switch.stop().unwrap();
}

#[test]
fn test_channel_descriptors_are_listed_with_owner() {
    let switch = Switch::for_testing();
    let (blocks, _) = TrackingReactor::new("blocks", &[0x40], ReactorConfig::synchronous());
    switch.add_reactor("blocks", blocks).unwrap();

    let descriptors = switch.channel_descriptors();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].0, "blocks");
    assert_eq!(descriptors[0].1, ChannelDescriptor::new(0x40));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SwitchConfig {
        max_peers: 0,
        ..SwitchConfig::default()
    };
    assert!(matches!(
        Switch::new(config),
        Err(SwitchError::InvalidConfiguration { .. })
    ));
}

// ----------------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_reactor_start_rolls_back_started_reactors() {
    let switch = Switch::for_testing();
    let (good, _) =
        TrackingReactor::new("good", &[0x01], ReactorConfig::asynchronous(4).unwrap());
    let bad = TrackingReactor::failing("bad", &[0x02], ReactorConfig::asynchronous(4).unwrap());

    switch.add_reactor("good", good.clone()).unwrap();
    switch.add_reactor("bad", bad.clone()).unwrap();

    assert!(matches!(
        switch.start(),
        Err(SwitchError::Reactor(ReactorError::Hook { .. }))
    ));
    assert!(!switch.is_running());
    assert!(!good.is_running());
    assert!(good.quit().is_fired());
    assert!(!bad.is_running());

    // Neither reactor is left with an open queue nobody drains
    assert!(good.recv_queue().is_closed());
    assert!(bad.recv_queue().is_closed());
}

#[tokio::test]
async fn test_stop_removes_peers_and_stops_reactors() {
    let switch = Switch::for_testing();
    let (reactor, _) =
        TrackingReactor::new("tracker", &[0x01], ReactorConfig::asynchronous(4).unwrap());
    switch.add_reactor("tracker", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(1);
    switch.add_peer(peer.clone()).unwrap();

    switch.stop().unwrap();
    switch.stop().unwrap();
    timeout(WAIT, switch.wait()).await.expect("receive routines should exit");

    assert_eq!(switch.num_peers(), 0);
    assert!(!peer.is_running());
    assert!(!reactor.is_running());
    assert_eq!(
        reactor.events(),
        vec![
            Event::Init(PeerId::from_index(1)),
            Event::Add(PeerId::from_index(1)),
            Event::Remove(PeerId::from_index(1), RemovalReason::Shutdown),
        ]
    );
}

// ----------------------------------------------------------------------------
// Peer Lifecycle
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_peer_goes_through_init_then_add() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("tracker", &[0x01], ReactorConfig::synchronous());
    switch.add_reactor("tracker", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(9);
    let added = switch.add_peer(peer).unwrap();

    assert!(added.is_running());
    assert!(switch.has_peer(&PeerId::from_index(9)));
    assert_eq!(peer_data::<bool>(added.as_ref(), INITIALIZED_KEY).as_deref(), Some(&true));
    assert_eq!(
        reactor.events(),
        vec![Event::Init(PeerId::from_index(9)), Event::Add(PeerId::from_index(9))]
    );
}

#[tokio::test]
async fn test_peer_failing_to_start_is_never_added_or_removed() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("tracker", &[0x01], ReactorConfig::synchronous());
    switch.add_reactor("tracker", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = MemoryPeer::new(PeerId::from_index(3), 4);
    let peer: Arc<dyn Peer> = Arc::new(peer.fail_on_start("handshake failed"));

    assert!(matches!(
        switch.add_peer(peer),
        Err(SwitchError::Reactor(ReactorError::PeerStartFailed { .. }))
    ));
    assert!(!switch.has_peer(&PeerId::from_index(3)));

    switch.stop().unwrap();
    assert_eq!(reactor.events(), vec![Event::Init(PeerId::from_index(3))]);
}

#[tokio::test]
async fn test_peer_limits_and_duplicates() {
    let config = SwitchConfig {
        max_peers: 1,
        ..SwitchConfig::testing()
    };
    let switch = Switch::new(config).unwrap();
    switch.start().unwrap();

    let (first, _first_out) = memory_peer(1);
    switch.add_peer(first).unwrap();

    let (again, _again_out) = memory_peer(1);
    assert!(matches!(
        switch.add_peer(again),
        Err(SwitchError::DuplicatePeer { .. })
    ));

    let (second, _second_out) = memory_peer(2);
    assert!(matches!(
        switch.add_peer(second),
        Err(SwitchError::TooManyPeers { current: 1, max: 1 })
    ));
}

#[tokio::test]
async fn test_add_peer_requires_running_switch() {
    let switch = Switch::for_testing();
    let (peer, _outbound) = memory_peer(1);
    assert!(matches!(switch.add_peer(peer), Err(SwitchError::NotRunning)));
}

#[tokio::test]
async fn test_graceful_and_error_removal() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("tracker", &[0x01], ReactorConfig::synchronous());
    switch.add_reactor("tracker", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (one, _one_out) = memory_peer(1);
    let (two, _two_out) = memory_peer(2);
    switch.add_peer(one).unwrap();
    switch.add_peer(two).unwrap();

    assert!(switch.stop_peer_gracefully(PeerId::from_index(1)));
    assert!(!switch.stop_peer_gracefully(PeerId::from_index(1)));
    switch.stop_peer_for_error(PeerId::from_index(2), RemovalReason::Error("timeout".to_string()));
    switch.stop_peer_for_error(PeerId::from_index(42), RemovalReason::Graceful);

    let removals: Vec<Event> = reactor
        .events()
        .into_iter()
        .filter(|event| matches!(event, Event::Remove(..)))
        .collect();
    assert_eq!(
        removals,
        vec![
            Event::Remove(PeerId::from_index(1), RemovalReason::Graceful),
            Event::Remove(
                PeerId::from_index(2),
                RemovalReason::Error("timeout".to_string())
            ),
        ]
    );
    assert_eq!(switch.num_peers(), 0);
}

/// Stops the switch from inside `init_peer`, landing a stop between the running
/// check and the peer table insert
struct StopOnInitReactor {
    base: BaseReactor,
    switch: OnceLock<Weak<Switch>>,
    added: AtomicUsize,
}

impl Reactor for StopOnInitReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(0x50)]
    }

    fn init_peer(&self, peer: Arc<dyn Peer>) -> Arc<dyn Peer> {
        if let Some(switch) = self.switch.get().and_then(Weak::upgrade) {
            switch.stop().unwrap();
        }
        peer
    }

    fn add_peer(&self, _peer: &Arc<dyn Peer>) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_peer_racing_with_stop_is_not_added() {
    let switch = Switch::for_testing();
    let reactor = Arc::new_cyclic(|me: &Weak<StopOnInitReactor>| StopOnInitReactor {
        base: BaseReactor::new("stopper", me.clone(), ReactorConfig::synchronous()),
        switch: OnceLock::new(),
        added: AtomicUsize::new(0),
    });
    reactor.switch.set(Arc::downgrade(&switch)).unwrap();
    switch.add_reactor("stopper", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(4);
    assert!(matches!(
        switch.add_peer(peer.clone()),
        Err(SwitchError::NotRunning)
    ));

    assert!(!switch.is_running());
    assert_eq!(switch.num_peers(), 0);
    assert!(!peer.is_running());
    assert_eq!(reactor.added.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_peer_limit_holds_under_concurrent_adds() {
    let config = SwitchConfig {
        max_peers: 5,
        ..SwitchConfig::testing()
    };
    let switch = Switch::new(config).unwrap();
    switch.start().unwrap();

    let mut tasks = JoinSet::new();
    for id in 0..64u64 {
        let switch = switch.clone();
        tasks.spawn(async move {
            let (peer, _outbound) = memory_peer(id);
            switch.add_peer(peer).is_ok()
        });
    }

    let mut added = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap() {
            added += 1;
        }
    }
    assert_eq!(added, 5);
    assert_eq!(switch.num_peers(), 5);
}

#[tokio::test]
async fn test_peer_slots_are_released() {
    let config = SwitchConfig {
        max_peers: 1,
        ..SwitchConfig::testing()
    };
    let switch = Switch::new(config).unwrap();
    switch.start().unwrap();

    let (failing, _failing_out) = MemoryPeer::new(PeerId::from_index(1), 4);
    let failing: Arc<dyn Peer> = Arc::new(failing.fail_on_start("handshake failed"));
    assert!(switch.add_peer(failing).is_err());

    let (first, _first_out) = memory_peer(2);
    switch.add_peer(first).unwrap();
    assert!(switch.stop_peer_gracefully(PeerId::from_index(2)));

    let (second, _second_out) = memory_peer(3);
    switch.add_peer(second).unwrap();
    assert_eq!(switch.num_peers(), 1);
}

// ----------------------------------------------------------------------------
// Message Routing
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_deliver_routes_by_channel_and_mode() {
    let switch = Switch::for_testing();
    let (sync_reactor, mut sync_rx) =
        TrackingReactor::new("sync", &[0x10], ReactorConfig::synchronous());
    let (async_reactor, mut async_rx) =
        TrackingReactor::new("async", &[0x11], ReactorConfig::asynchronous(4).unwrap());
    switch.add_reactor("sync", sync_reactor.clone()).unwrap();
    switch.add_reactor("async", async_reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(1);
    let peer = switch.add_peer(peer).unwrap();

    switch
        .deliver(ChannelId::new(0x10), &peer, b"inline".to_vec())
        .await
        .unwrap();
    // Synchronous delivery already ran receive
    assert_eq!(sync_rx.try_recv().unwrap(), b"inline".to_vec());

    for i in 0..50u8 {
        switch
            .deliver(ChannelId::new(0x11), &peer, vec![i])
            .await
            .unwrap();
    }
    let received = collect(&mut async_rx, 50).await;
    assert_eq!(received, (0..50u8).map(|i| vec![i]).collect::<Vec<_>>());

    let routed_elsewhere = sync_reactor.events().iter().any(|event| {
        matches!(event, Event::Receive(channel, ..) if *channel == ChannelId::new(0x11))
    });
    assert!(!routed_elsewhere);
}

#[tokio::test]
async fn test_deliver_rejects_bad_input() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("tracker", &[0x01], ReactorConfig::synchronous());
    switch.add_reactor("tracker", reactor.clone()).unwrap();

    let (peer, _outbound) = memory_peer(1);
    assert!(matches!(
        switch.deliver(ChannelId::new(0x01), &peer, vec![1]).await,
        Err(SwitchError::NotRunning)
    ));

    switch.start().unwrap();
    assert!(matches!(
        switch.deliver(ChannelId::new(0x01), &peer, Vec::new()).await,
        Err(SwitchError::Reactor(ReactorError::EmptyPayload { .. }))
    ));
    assert!(matches!(
        switch.deliver(ChannelId::new(0x7f), &peer, vec![1]).await,
        Err(SwitchError::UnknownChannel { .. })
    ));
    assert!(reactor.events().is_empty());
}

/// Accepts payloads of at most four bytes on channel 0x60
struct LimitedReactor {
    base: BaseReactor,
    received: AtomicUsize,
}

impl Reactor for LimitedReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(0x60).with_recv_message_capacity(4)]
    }

    fn receive(&self, _channel_id: ChannelId, _peer: &Arc<dyn Peer>, _payload: &[u8]) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let switch = Switch::for_testing();
    let reactor = Arc::new_cyclic(|me: &Weak<LimitedReactor>| LimitedReactor {
        base: BaseReactor::new("limited", me.clone(), ReactorConfig::synchronous()),
        received: AtomicUsize::new(0),
    });
    switch.add_reactor("limited", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(1);
    let peer = switch.add_peer(peer).unwrap();
    let channel = ChannelId::new(0x60);

    switch.deliver(channel, &peer, vec![0; 4]).await.unwrap();
    assert!(matches!(
        switch.deliver(channel, &peer, vec![0; 5]).await,
        Err(SwitchError::MessageTooLarge { size: 5, max: 4, .. })
    ));
    assert_eq!(reactor.received.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reactor_can_disconnect_misbehaving_peer() {
    let switch = Switch::for_testing();
    let (reactor, _) = TrackingReactor::new("tracker", &[0x01], ReactorConfig::synchronous());
    switch.add_reactor("tracker", reactor.clone()).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(5);
    let peer = switch.add_peer(peer).unwrap();

    switch
        .deliver(ChannelId::new(0x01), &peer, b"bad".to_vec())
        .await
        .unwrap();

    assert!(!switch.has_peer(&PeerId::from_index(5)));
    assert!(!peer.is_running());
    assert!(reactor.events().contains(&Event::Remove(
        PeerId::from_index(5),
        RemovalReason::ProtocolViolation("bad payload".to_string())
    )));
}

#[tokio::test]
async fn test_broadcast_reaches_every_running_peer() {
    let switch = Switch::for_testing();
    switch.start().unwrap();

    let (one, mut one_out) = memory_peer(1);
    let (two, mut two_out) = memory_peer(2);
    switch.add_peer(one).unwrap();
    switch.add_peer(two).unwrap();

    assert_eq!(switch.broadcast(ChannelId::new(0x22), b"hello"), 2);

    for outbound in [&mut one_out, &mut two_out] {
        let message = outbound.recv().await.unwrap();
        assert_eq!(message.channel_id, ChannelId::new(0x22));
        assert_eq!(message.payload, b"hello".to_vec());
    }
}

// ----------------------------------------------------------------------------
// Back-pressure
// ----------------------------------------------------------------------------

/// Asynchronous reactor whose receive parks until the test opens the gate
struct GatedReactor {
    base: BaseReactor,
    entered: mpsc::UnboundedSender<Vec<u8>>,
    gate: Mutex<std::sync::mpsc::Receiver<()>>,
}

impl Reactor for GatedReactor {
    fn base(&self) -> &BaseReactor {
        &self.base
    }

    fn get_channels(&self) -> Vec<ChannelDescriptor> {
        vec![ChannelDescriptor::new(0x30)]
    }

    fn receive(&self, _channel_id: ChannelId, _peer: &Arc<dyn Peer>, payload: &[u8]) {
        let _ = self.entered.send(payload.to_vec());
        let _ = self.gate.lock().unwrap().recv();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_enqueue_times_out_when_reactor_is_saturated() {
    let config = SwitchConfig {
        enqueue_timeout_ms: Some(50),
        ..SwitchConfig::testing()
    };
    let switch = Switch::new(config).unwrap();

    let (entered, mut entered_rx) = mpsc::unbounded_channel();
    let (gate, gate_rx) = std::sync::mpsc::channel();
    let reactor = Arc::new_cyclic(|me: &Weak<GatedReactor>| GatedReactor {
        base: BaseReactor::new("gated", me.clone(), ReactorConfig::asynchronous(1).unwrap()),
        entered,
        gate: Mutex::new(gate_rx),
    });
    switch.add_reactor("gated", reactor).unwrap();
    switch.start().unwrap();

    let (peer, _outbound) = memory_peer(1);
    let peer = switch.add_peer(peer).unwrap();
    let channel = ChannelId::new(0x30);

    // First message parks the receive routine, second fills the queue
    switch.deliver(channel, &peer, vec![1]).await.unwrap();
    assert_eq!(collect(&mut entered_rx, 1).await, vec![vec![1]]);
    switch.deliver(channel, &peer, vec![2]).await.unwrap();

    assert!(matches!(
        switch.deliver(channel, &peer, vec![3]).await,
        Err(SwitchError::EnqueueTimeout { timeout, .. }) if timeout == Duration::from_millis(50)
    ));

    gate.send(()).unwrap();
    gate.send(()).unwrap();
    assert_eq!(collect(&mut entered_rx, 1).await, vec![vec![2]]);

    switch.stop().unwrap();
    timeout(WAIT, switch.wait()).await.expect("receive routine should exit");
}
