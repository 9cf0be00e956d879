//! Buffered messages
//!
//! A [`BufferedMessage`] is what the switch places on an asynchronous reactor's queue:
//! the channel, the originating peer and the payload captured at delivery time.

use core::fmt;
use std::sync::Arc;

use crate::errors::{ReactorError, ReactorResult};
use crate::peer::Peer;
use crate::types::ChannelId;

/// Channel id, peer and payload of one inbound message
///
/// The payload is owned by the message, so the deliverer is free to reuse its own
/// buffers once the message is built. Each message is consumed exactly once.
pub struct BufferedMessage {
    channel_id: ChannelId,
    peer: Arc<dyn Peer>,
    payload: Vec<u8>,
}

impl BufferedMessage {
    /// Capture an inbound message. Empty payloads are a caller bug and are refused.
    pub fn new(
        channel_id: ChannelId,
        peer: Arc<dyn Peer>,
        payload: Vec<u8>,
    ) -> ReactorResult<Self> {
        if payload.is_empty() {
            return Err(ReactorError::EmptyPayload { channel_id });
        }
        Ok(Self {
            channel_id,
            peer,
            payload,
        })
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn peer(&self) -> &Arc<dyn Peer> {
        &self.peer
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_parts(self) -> (ChannelId, Arc<dyn Peer>, Vec<u8>) {
        (self.channel_id, self.peer, self.payload)
    }
}

impl fmt::Debug for BufferedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedMessage")
            .field("channel_id", &self.channel_id)
            .field("peer", &self.peer.id())
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
