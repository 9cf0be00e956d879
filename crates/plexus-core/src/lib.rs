//! Plexus Reactor Core
//!
//! This crate defines the pluggable message-handler contract for a peer-to-peer node.
//! Independent subsystems ("reactors") register interest in channels of a multiplexed
//! connection, receive peer lifecycle notifications and consume inbound messages either
//! in-line on the deliverer's task or through an owned, bounded queue drained by a
//! dedicated background task.
//!
//! - [`Reactor`]: the capability set every reactor implements
//! - [`BaseReactor`]: lifecycle wiring, optional receive queue and the drain routine
//! - [`BaseService`]: start/stop state machine and the single-fire [`QuitSignal`]
//! - [`Peer`]: the remote node capability consumed by reactors
//!
//! The orchestrator that owns reactors and peers lives in `plexus-switch`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod base;
pub mod channel;
pub mod config;
pub mod errors;
pub mod memory;
pub mod message;
pub mod peer;
pub mod reactor;
pub mod service;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use base::{BaseReactor, RecvQueue};
pub use channel::ChannelDescriptor;
pub use config::{DeliveryMode, ReactorConfig};
pub use errors::{ReactorError, ReactorResult};
pub use memory::{MemoryPeer, OutboundMessage};
pub use message::BufferedMessage;
pub use peer::{peer_data, Peer, PeerData, RemovalReason};
pub use reactor::{Reactor, SwitchHandle};
pub use service::{BaseService, LifecycleState, QuitSignal};
pub use types::{ChannelId, PeerId};
