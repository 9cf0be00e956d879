//! Channel descriptors
//!
//! A descriptor is opaque metadata a reactor hands to the switch to claim a channel.
//! The core never interprets priority or capacities; the transport layer does.

use serde::{Deserialize, Serialize};

use crate::types::ChannelId;

/// Per-channel configuration declared by a reactor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Channel identifier, unique across all reactors of one switch
    pub id: ChannelId,
    /// Relative send priority
    pub priority: u32,
    /// Number of outbound messages queued per peer before sends block
    pub send_queue_capacity: usize,
    /// Initial receive buffer size in bytes
    pub recv_buffer_capacity: usize,
    /// Largest message accepted on this channel in bytes
    pub recv_message_capacity: usize,
}

impl ChannelDescriptor {
    pub const DEFAULT_PRIORITY: u32 = 1;
    pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 1;
    pub const DEFAULT_RECV_BUFFER_CAPACITY: usize = 4096;
    pub const DEFAULT_RECV_MESSAGE_CAPACITY: usize = 22_020_096; // 21 MiB

    /// Descriptor for `id` with default priority and capacities
    pub fn new(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            priority: Self::DEFAULT_PRIORITY,
            send_queue_capacity: Self::DEFAULT_SEND_QUEUE_CAPACITY,
            recv_buffer_capacity: Self::DEFAULT_RECV_BUFFER_CAPACITY,
            recv_message_capacity: Self::DEFAULT_RECV_MESSAGE_CAPACITY,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity;
        self
    }

    pub fn with_recv_buffer_capacity(mut self, capacity: usize) -> Self {
        self.recv_buffer_capacity = capacity;
        self
    }

    pub fn with_recv_message_capacity(mut self, capacity: usize) -> Self {
        self.recv_message_capacity = capacity;
        self
    }
}
