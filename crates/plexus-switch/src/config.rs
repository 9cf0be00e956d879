//! Switch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SwitchError, SwitchResult};

/// Limits and back-pressure policy of a [`Switch`](crate::Switch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Maximum number of simultaneously connected peers
    pub max_peers: usize,
    /// Upper bound on how long `deliver` waits for room in an asynchronous reactor's
    /// queue. `None` waits indefinitely.
    pub enqueue_timeout_ms: Option<u64>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            max_peers: 50,
            enqueue_timeout_ms: None,
        }
    }
}

impl SwitchConfig {
    /// Configuration for tests: generous peer limit and a short enqueue bound
    pub fn testing() -> Self {
        Self {
            max_peers: 1000,
            enqueue_timeout_ms: Some(1000),
        }
    }

    pub fn validate(&self) -> SwitchResult<()> {
        if self.max_peers == 0 {
            return Err(SwitchError::InvalidConfiguration {
                reason: "max_peers must be positive".to_string(),
            });
        }
        if self.enqueue_timeout_ms == Some(0) {
            return Err(SwitchError::InvalidConfiguration {
                reason: "enqueue_timeout_ms must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn enqueue_timeout(&self) -> Option<Duration> {
        self.enqueue_timeout_ms.map(Duration::from_millis)
    }
}
