//! Error types for the reactor core
//!
//! Recoverable failures surface as [`ReactorError`]. Integration mistakes that would
//! otherwise drop messages silently (asking a synchronous reactor for its receive
//! queue) panic instead of returning an error.

use crate::types::{ChannelId, PeerId};

/// Core error type for reactors, peers and the lifecycle capability
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("Invalid reactor configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Service {name} already started")]
    AlreadyStarted { name: String },

    #[error("Service {name} already stopped")]
    AlreadyStopped { name: String },

    #[error("No tokio runtime available to spawn the receive routine of {name}")]
    NoRuntime { name: String },

    #[error("Reactor {name} was dropped while its base was still in use")]
    Detached { name: String },

    #[error("Empty payload delivered on channel {channel_id}")]
    EmptyPayload { channel_id: ChannelId },

    #[error("Receive queue full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("Receive queue closed")]
    QueueClosed,

    #[error("Peer {peer_id} failed to start: {reason}")]
    PeerStartFailed { peer_id: PeerId, reason: String },

    #[error("Invalid peer id: {input}")]
    InvalidPeerId { input: String },

    #[error("{name} start hook failed: {reason}")]
    Hook { name: String, reason: String },
}

impl ReactorError {
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn hook(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Hook {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for reactor core operations
pub type ReactorResult<T> = core::result::Result<T, ReactorError>;
