//! Error handling for the switch

use std::time::Duration;

use plexus_core::{ChannelId, PeerId, ReactorError};
use thiserror::Error;

/// Switch-specific error types
#[derive(Error, Debug)]
pub enum SwitchError {
    #[error("Reactor error: {0}")]
    Reactor(#[from] ReactorError),

    #[error("Invalid switch configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Reactor {name} is already registered")]
    DuplicateReactor { name: String },

    #[error("Channel {channel_id} requested by {requested_by} is already owned by {owner}")]
    DuplicateChannel {
        channel_id: ChannelId,
        owner: String,
        requested_by: String,
    },

    #[error("No reactor registered for channel {channel_id}")]
    UnknownChannel { channel_id: ChannelId },

    #[error("Peer {peer_id} is already connected")]
    DuplicatePeer { peer_id: PeerId },

    #[error("Peer limit reached: {current}/{max}")]
    TooManyPeers { current: usize, max: usize },

    #[error("Switch is not running")]
    NotRunning,

    #[error("Switch already started; reactors must be added before start")]
    AlreadyRunning,

    #[error("Enqueue to reactor {reactor} on channel {channel_id} timed out after {timeout:?}")]
    EnqueueTimeout {
        reactor: String,
        channel_id: ChannelId,
        timeout: Duration,
    },

    #[error("Message of {size} bytes on channel {channel_id} exceeds the limit of {max} bytes")]
    MessageTooLarge {
        channel_id: ChannelId,
        size: usize,
        max: usize,
    },
}

/// Result type for switch operations
pub type SwitchResult<T> = std::result::Result<T, SwitchError>;
