//! Reactor configuration
//!
//! The delivery mode is the only knob the core owns. It is fixed when the
//! [`BaseReactor`](crate::BaseReactor) is built and never changes afterwards.

use core::num::NonZeroUsize;
use serde::{Deserialize, Serialize};

use crate::errors::{ReactorError, ReactorResult};

// ----------------------------------------------------------------------------
// Delivery Mode
// ----------------------------------------------------------------------------

/// How inbound messages reach a reactor's `receive`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryMode {
    /// `receive` runs on the deliverer's task and may stall it
    Synchronous,
    /// Messages go through a bounded queue drained by the reactor's own task
    Asynchronous { capacity: NonZeroUsize },
}

// ----------------------------------------------------------------------------
// Reactor Configuration
// ----------------------------------------------------------------------------

/// Construction-time configuration of a reactor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactorConfig {
    pub delivery: DeliveryMode,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self::synchronous()
    }
}

impl ReactorConfig {
    /// Queue capacity used by [`ReactorConfig::asynchronous_default`]
    pub const DEFAULT_RECV_QUEUE_CAPACITY: usize = 1000;

    /// In-line delivery, no queue
    pub fn synchronous() -> Self {
        Self {
            delivery: DeliveryMode::Synchronous,
        }
    }

    /// Queued delivery with the given capacity; zero is rejected
    pub fn asynchronous(capacity: usize) -> ReactorResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            ReactorError::invalid_configuration("receive queue capacity must be positive")
        })?;
        Ok(Self {
            delivery: DeliveryMode::Asynchronous { capacity },
        })
    }

    /// Queued delivery with [`Self::DEFAULT_RECV_QUEUE_CAPACITY`]
    pub fn asynchronous_default() -> Self {
        Self {
            delivery: DeliveryMode::Asynchronous {
                capacity: NonZeroUsize::new(Self::DEFAULT_RECV_QUEUE_CAPACITY)
                    .unwrap_or(NonZeroUsize::MIN),
            },
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.delivery, DeliveryMode::Asynchronous { .. })
    }

    /// Queue capacity, `None` for synchronous reactors
    pub fn capacity(&self) -> Option<usize> {
        match self.delivery {
            DeliveryMode::Synchronous => None,
            DeliveryMode::Asynchronous { capacity } => Some(capacity.get()),
        }
    }
}
