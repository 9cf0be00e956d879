//! Plexus CLI Configuration
//!
//! Configuration is read from a TOML file with optional `[switch]` and `[reactor]`
//! tables; anything missing falls back to defaults. Command-line flags override
//! the reactor delivery mode afterwards.
//!
//! ```toml
//! [switch]
//! max_peers = 16
//! enqueue_timeout_ms = 500
//!
//! [reactor.delivery]
//! mode = "asynchronous"
//! capacity = 64
//! ```

use std::path::Path;

use plexus_core::ReactorConfig;
use plexus_switch::SwitchConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cli::Mode;
use crate::error::Result;

/// Complete configuration of the demo application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Switch limits and back-pressure policy
    pub switch: SwitchConfig,
    /// Delivery mode of the counting reactor
    pub reactor: ReactorConfig,
}

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.switch.validate()?;
        Ok(config)
    }

    /// Reactor configuration after applying command-line overrides
    ///
    /// An explicit capacity implies asynchronous delivery. Asynchronous mode without
    /// a capacity keeps the configured one, or the default when the file asked for
    /// synchronous delivery.
    pub fn reactor_with(
        &self,
        mode: Option<Mode>,
        capacity: Option<usize>,
    ) -> Result<ReactorConfig> {
        let config = match (mode, capacity) {
            (Some(Mode::Sync), capacity) => {
                if let Some(capacity) = capacity {
                    warn!(capacity, "Ignoring queue capacity for synchronous delivery");
                }
                ReactorConfig::synchronous()
            }
            (Some(Mode::Async), None) => match self.reactor.capacity() {
                Some(configured) => ReactorConfig::asynchronous(configured)?,
                None => ReactorConfig::asynchronous_default(),
            },
            (_, Some(capacity)) => ReactorConfig::asynchronous(capacity)?,
            (None, None) => self.reactor.clone(),
        };
        Ok(config)
    }
}
