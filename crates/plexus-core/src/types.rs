//! Identifier types shared by reactors, peers and the switch
//!
//! Newtypes keep channel and peer identifiers from being mixed up with raw bytes.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::errors::ReactorError;

// ----------------------------------------------------------------------------
// Peer Identifier
// ----------------------------------------------------------------------------

/// Unique identifier for a remote node (8 bytes, displayed as hex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 8]);

impl PeerId {
    /// Create a new PeerId from 8 bytes
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Build a PeerId from a small integer, handy for simulations
    pub fn from_index(index: u64) -> Self {
        Self(index.to_be_bytes())
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PeerId {
    type Err = ReactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = s.strip_prefix("0x").unwrap_or(s);
        let invalid = || ReactorError::InvalidPeerId {
            input: s.to_string(),
        };

        let bytes = hex::decode(clean).map_err(|_| invalid())?;
        if bytes.is_empty() || bytes.len() > 8 {
            return Err(invalid());
        }

        // Shorter ids are right-aligned so "01" and "0000000000000001" agree
        let mut id = [0u8; 8];
        id[8 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

// ----------------------------------------------------------------------------
// Channel Identifier
// ----------------------------------------------------------------------------

/// Identifier of one logical channel multiplexed over a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u8);

impl ChannelId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
