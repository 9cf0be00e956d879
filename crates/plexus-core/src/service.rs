//! Service lifecycle
//!
//! [`BaseService`] is the start/stop state machine shared by reactors and the switch:
//!
//! ```text
//! Created -> Starting -> Running -> Stopping -> Stopped
//! ```
//!
//! A service starts at most once and never restarts. Stopping fires the service's
//! [`QuitSignal`], a single-fire broadcast every background task of the service
//! selects on.

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::errors::{ReactorError, ReactorResult};

// ----------------------------------------------------------------------------
// Lifecycle State
// ----------------------------------------------------------------------------

/// Lifecycle state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Created,
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopping => write!(f, "stopping"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

// ----------------------------------------------------------------------------
// Quit Signal
// ----------------------------------------------------------------------------

/// Receiving side of a service's quit broadcast
///
/// Cheap to clone; every clone observes the same single transition to "fired".
#[derive(Debug, Clone)]
pub struct QuitSignal {
    receiver: watch::Receiver<bool>,
}

impl QuitSignal {
    /// Whether the service has signalled quit
    pub fn is_fired(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once quit has been signalled, or the service has been dropped
    pub async fn fired(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Base Service
// ----------------------------------------------------------------------------

/// Start/stop state machine with a quit broadcast
#[derive(Debug)]
pub struct BaseService {
    name: String,
    state: AtomicU8,
    quit: watch::Sender<bool>,
}

impl BaseService {
    pub fn new(name: impl Into<String>) -> Self {
        let (quit, _) = watch::channel(false);
        Self {
            name: name.into(),
            state: AtomicU8::new(LifecycleState::Created as u8),
            quit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Subscribe to the quit broadcast
    pub fn quit(&self) -> QuitSignal {
        QuitSignal {
            receiver: self.quit.subscribe(),
        }
    }

    /// Transition to `Running`, running `on_start` while in `Starting`
    ///
    /// If `on_start` fails the service ends up `Stopped` with quit fired, and the
    /// error is returned.
    pub fn start<F>(&self, on_start: F) -> ReactorResult<()>
    where
        F: FnOnce() -> ReactorResult<()>,
    {
        if let Err(current) = self.transition(LifecycleState::Created, LifecycleState::Starting) {
            return Err(match current {
                LifecycleState::Starting | LifecycleState::Running => {
                    debug!(service = %self.name, "Not starting: already started");
                    ReactorError::AlreadyStarted {
                        name: self.name.clone(),
                    }
                }
                _ => {
                    debug!(service = %self.name, "Not starting: already stopped");
                    ReactorError::AlreadyStopped {
                        name: self.name.clone(),
                    }
                }
            });
        }

        info!(service = %self.name, "Starting service");

        if let Err(e) = on_start() {
            error!(service = %self.name, error = %e, "Service failed to start");
            self.state
                .store(LifecycleState::Stopped as u8, Ordering::Release);
            self.fire_quit();
            return Err(e);
        }

        // A concurrent stop() may have moved us out of Starting
        if self
            .transition(LifecycleState::Starting, LifecycleState::Running)
            .is_err()
        {
            return Err(ReactorError::AlreadyStopped {
                name: self.name.clone(),
            });
        }

        Ok(())
    }

    /// Transition to `Stopped` and fire quit. Idempotent.
    ///
    /// `on_stop` runs only when stopping a service that reached `Running`.
    pub fn stop<F>(&self, on_stop: F) -> ReactorResult<()>
    where
        F: FnOnce(),
    {
        loop {
            match self.state() {
                LifecycleState::Created | LifecycleState::Starting => {
                    let from = self.state();
                    if self.transition(from, LifecycleState::Stopped).is_ok() {
                        debug!(
                            service = %self.name,
                            state = %from,
                            "Stopping service that never ran"
                        );
                        self.fire_quit();
                        return Ok(());
                    }
                }
                LifecycleState::Running => {
                    if self
                        .transition(LifecycleState::Running, LifecycleState::Stopping)
                        .is_ok()
                    {
                        info!(service = %self.name, "Stopping service");
                        on_stop();
                        self.fire_quit();
                        self.state
                            .store(LifecycleState::Stopped as u8, Ordering::Release);
                        return Ok(());
                    }
                }
                LifecycleState::Stopping | LifecycleState::Stopped => {
                    debug!(service = %self.name, "Service already stopped");
                    return Ok(());
                }
            }
        }
    }

    fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }

    fn fire_quit(&self) {
        // send_replace succeeds even when nobody is subscribed yet
        self.quit.send_replace(true);
    }
}
