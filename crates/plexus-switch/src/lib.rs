//! Plexus Switch
//!
//! The orchestrator side of the reactor contract:
//! - `Switch`: registers reactors, enforces unique channel ownership, drives the reactor
//!   and peer lifecycles, and routes inbound messages to the owning reactor
//! - `SwitchConfig`: peer limits and the enqueue back-pressure bound
//!
//! The switch does no network I/O. Transports hand it started-or-startable peers and
//! inbound `(channel, peer, payload)` triples.

pub mod config;
pub mod error;
mod switch;

pub use config::SwitchConfig;
pub use error::{SwitchError, SwitchResult};
pub use switch::Switch;

// Re-export core types for convenience
pub use plexus_core::{
    BaseReactor, BufferedMessage, ChannelDescriptor, ChannelId, MemoryPeer, Peer, PeerId,
    Reactor, ReactorConfig, ReactorError, RemovalReason, SwitchHandle,
};
