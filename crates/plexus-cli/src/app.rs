//! Simulation driver
//!
//! Wires the demo reactors into a switch, connects in-memory peers and pushes their
//! traffic through concurrently, one delivery task per peer.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use plexus_core::{MemoryPeer, OutboundMessage, Peer, PeerId, ReactorConfig};
use plexus_switch::Switch;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::reactors::{CountingReactor, EchoReactor, COUNTER_CHANNEL, ECHO_CHANNEL};

/// How long to wait for queued messages to drain after delivery finished
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound queue size of each simulated peer
const PEER_SEND_CAPACITY: usize = 4;

/// Parameters of one simulation run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub peers: usize,
    pub messages: u64,
    pub reactor: ReactorConfig,
}

/// Outcome of a simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub peers: usize,
    pub messages_per_peer: u64,
    pub queue_capacity: Option<usize>,
    pub counted: u64,
    pub order_violations: u64,
    pub echoed: u64,
    pub echoes_received: u64,
    pub elapsed: Duration,
}

impl SimulationReport {
    pub fn expected(&self) -> u64 {
        self.peers as u64 * self.messages_per_peer
    }

    /// Every message counted and every peer's order preserved
    pub fn is_clean(&self) -> bool {
        self.counted == self.expected() && self.order_violations == 0
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.queue_capacity {
            Some(capacity) => format!("asynchronous (capacity {capacity})"),
            None => "synchronous".to_string(),
        };
        let order = if self.order_violations == 0 {
            "yes".to_string()
        } else {
            format!("no ({} violations)", self.order_violations)
        };
        let counter = format!("{}:", CountingReactor::NAME);
        let echo = format!("{}:", EchoReactor::NAME);

        writeln!(f, "Peers:            {}", self.peers)?;
        writeln!(f, "Delivery mode:    {mode}")?;
        writeln!(f, "{counter:<17} {}/{}", self.counted, self.expected())?;
        writeln!(f, "Order preserved:  {order}")?;
        writeln!(f, "{echo:<17} {} sent, {} received", self.echoed, self.echoes_received)?;
        write!(f, "Elapsed:          {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Switch with the counting reactor (in the given mode) and the echo reactor
/// registered, not yet started
pub fn build_switch(
    config: &AppConfig,
    reactor: ReactorConfig,
) -> Result<(Arc<Switch>, Arc<CountingReactor>, Arc<EchoReactor>)> {
    let switch = Switch::new(config.switch.clone())?;
    let counter = CountingReactor::new(reactor);
    let echo = EchoReactor::new();

    switch.add_reactor(CountingReactor::NAME, counter.clone())?;
    switch.add_reactor(EchoReactor::NAME, echo.clone())?;
    Ok((switch, counter, echo))
}

/// Run a full simulation and stop the switch afterwards
pub async fn run_simulation(config: &AppConfig, options: RunOptions) -> Result<SimulationReport> {
    if options.peers == 0 {
        return Err(CliError::Config("at least one peer is required".to_string()));
    }
    let queue_capacity = options.reactor.capacity();
    let (switch, counter, echo) = build_switch(config, options.reactor)?;
    switch.start()?;

    let outcome = drive(&switch, &counter, options.peers, options.messages).await;

    switch.stop()?;
    switch.wait().await;

    let (echoes_received, elapsed) = outcome?;
    let report = SimulationReport {
        peers: options.peers,
        messages_per_peer: options.messages,
        queue_capacity,
        counted: counter.received(),
        order_violations: counter.order_violations(),
        echoed: echo.echoed(),
        echoes_received,
        elapsed,
    };
    info!(counted = report.counted, violations = report.order_violations, "Simulation finished");
    Ok(report)
}

async fn drive(
    switch: &Arc<Switch>,
    counter: &CountingReactor,
    peers: usize,
    messages: u64,
) -> Result<(u64, Duration)> {
    let mut outbound = Vec::with_capacity(peers);
    let mut connected = Vec::with_capacity(peers);
    for index in 0..peers {
        let id = PeerId::from_index(index as u64 + 1);
        let (peer, receiver) = MemoryPeer::new(id, PEER_SEND_CAPACITY);
        // The node dials every simulated peer
        connected.push(switch.add_peer(Arc::new(peer.outbound()))?);
        outbound.push(receiver);
    }
    info!(peers, messages, "Peers connected, delivering");

    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for peer in connected {
        let switch = switch.clone();
        tasks.spawn(async move { deliver_all(&switch, peer, messages).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| CliError::Simulation(format!("delivery task failed: {e}")))??;
    }

    let expected = peers as u64 * messages;
    tokio::time::timeout(DRAIN_TIMEOUT, counter.wait_for(expected))
        .await
        .map_err(|_| {
            CliError::Simulation(format!(
                "counted {} of {expected} messages within {DRAIN_TIMEOUT:?}",
                counter.received()
            ))
        })?;
    let elapsed = started.elapsed();

    let echoes_received = outbound.iter_mut().map(count_echoes).sum();
    Ok((echoes_received, elapsed))
}

async fn deliver_all(switch: &Switch, peer: Arc<dyn Peer>, messages: u64) -> anyhow::Result<()> {
    for sequence in 0..messages {
        switch
            .deliver(COUNTER_CHANNEL, &peer, sequence.to_be_bytes().to_vec())
            .await
            .with_context(|| format!("peer {} message {sequence}", peer.id()))?;
    }
    switch
        .deliver(ECHO_CHANNEL, &peer, b"ping".to_vec())
        .await
        .with_context(|| format!("peer {} echo", peer.id()))?;
    debug!(peer = %peer.id(), messages, "Peer finished delivering");
    Ok(())
}

fn count_echoes(receiver: &mut mpsc::Receiver<OutboundMessage>) -> u64 {
    let mut count = 0;
    while let Ok(message) = receiver.try_recv() {
        if message.channel_id == ECHO_CHANNEL {
            count += 1;
        }
    }
    count
}
