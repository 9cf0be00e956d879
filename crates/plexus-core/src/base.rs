//! Base reactor
//!
//! [`BaseReactor`] is embedded by every concrete reactor. It owns the lifecycle, the
//! optional bounded receive queue and the receive routine that drains it.
//!
//! The base holds a weak reference to the reactor that embeds it, so the receive
//! routine dispatches to the concrete `receive` rather than a default. Build the
//! reactor with [`Arc::new_cyclic`]:
//!
//! ```rust
//! use std::sync::{Arc, Weak};
//! use plexus_core::{BaseReactor, ChannelId, Peer, Reactor, ReactorConfig};
//!
//! struct Consensus {
//!     base: BaseReactor,
//! }
//!
//! impl Reactor for Consensus {
//!     fn base(&self) -> &BaseReactor {
//!         &self.base
//!     }
//!
//!     fn receive(&self, _channel_id: ChannelId, _peer: &Arc<dyn Peer>, _payload: &[u8]) {
//!         // decode and apply
//!     }
//! }
//!
//! let config = ReactorConfig::asynchronous(64).unwrap();
//! let reactor = Arc::new_cyclic(|me: &Weak<Consensus>| Consensus {
//!     base: BaseReactor::new("consensus", me.clone(), config),
//! });
//! assert!(reactor.is_async());
//! ```

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::ReactorConfig;
use crate::errors::{ReactorError, ReactorResult};
use crate::message::BufferedMessage;
use crate::reactor::{Reactor, SwitchHandle};
use crate::service::{BaseService, QuitSignal};

// ----------------------------------------------------------------------------
// Receive Queue
// ----------------------------------------------------------------------------

/// Producer side of an asynchronous reactor's receive queue
///
/// Many deliverers may hold clones; the reactor's receive routine is the only consumer.
#[derive(Debug, Clone)]
pub struct RecvQueue {
    sender: mpsc::Sender<BufferedMessage>,
    capacity: usize,
}

impl RecvQueue {
    /// Enqueue `message`, waiting while the queue is at capacity
    pub async fn send(&self, message: BufferedMessage) -> ReactorResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| ReactorError::QueueClosed)
    }

    /// Enqueue `message` without waiting
    pub fn try_send(&self, message: BufferedMessage) -> ReactorResult<()> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => ReactorError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => ReactorError::QueueClosed,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the receive routine has exited or the reactor stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ----------------------------------------------------------------------------
// Base Reactor
// ----------------------------------------------------------------------------

/// Default lifecycle, queue and switch wiring for reactors
pub struct BaseReactor {
    service: BaseService,
    reactor: Weak<dyn Reactor>,
    config: ReactorConfig,
    queue: Option<RecvQueue>,
    receiver: Mutex<Option<mpsc::Receiver<BufferedMessage>>>,
    routine: Mutex<Option<JoinHandle<()>>>,
    switch: OnceLock<Weak<dyn SwitchHandle>>,
}

impl BaseReactor {
    /// Create the base for the reactor behind `reactor`.
    ///
    /// The delivery mode in `config` is fixed for the reactor's lifetime. An
    /// asynchronous config allocates the bounded queue here; the receive routine is
    /// only spawned by [`BaseReactor::start`].
    pub fn new<R: Reactor>(
        name: impl Into<String>,
        reactor: Weak<R>,
        config: ReactorConfig,
    ) -> Self {
        let reactor: Weak<dyn Reactor> = reactor;
        let (queue, receiver) = match config.capacity() {
            Some(capacity) => {
                let (sender, receiver) = mpsc::channel(capacity);
                (Some(RecvQueue { sender, capacity }), Some(receiver))
            }
            None => (None, None),
        };

        Self {
            service: BaseService::new(name),
            reactor,
            config,
            queue,
            receiver: Mutex::new(receiver),
            routine: Mutex::new(None),
            switch: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.service.name()
    }

    pub fn service(&self) -> &BaseService {
        &self.service
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.service.is_running()
    }

    pub fn is_async(&self) -> bool {
        self.queue.is_some()
    }

    pub fn quit(&self) -> QuitSignal {
        self.service.quit()
    }

    /// Record the owning switch. Only the first call has an effect.
    pub fn set_switch(&self, switch: Weak<dyn SwitchHandle>) {
        if self.switch.set(switch).is_err() {
            warn!(reactor = %self.name(), "Switch already set, ignoring");
        }
    }

    /// The owning switch, if set and still alive
    pub fn switch(&self) -> Option<Arc<dyn SwitchHandle>> {
        self.switch.get().and_then(Weak::upgrade)
    }

    /// Producer handle of the receive queue.
    ///
    /// # Panics
    ///
    /// Panics if the reactor was built synchronous: a deliverer that cannot reach the
    /// queue would otherwise drop messages without anyone noticing.
    pub fn recv_queue(&self) -> RecvQueue {
        match &self.queue {
            Some(queue) => queue.clone(),
            None => panic!(
                "reactor {} is synchronous, but recv_queue() was called",
                self.name()
            ),
        }
    }

    /// Start the reactor: run its `on_start` hook, then spawn the receive routine if
    /// the reactor is asynchronous. Asynchronous reactors must be started from within
    /// a tokio runtime.
    ///
    /// A failed start leaves the reactor stopped with its queue closed.
    pub fn start(&self) -> ReactorResult<()> {
        let mut runtime = None;
        let started = self.service.start(|| {
            let reactor = self.reactor.upgrade().ok_or_else(|| ReactorError::Detached {
                name: self.name().to_string(),
            })?;
            if self.queue.is_some() {
                let handle = Handle::try_current().map_err(|_| ReactorError::NoRuntime {
                    name: self.name().to_string(),
                })?;
                runtime = Some(handle);
            }
            reactor.on_start()
        });
        if let Err(e) = started {
            self.close_unspawned_queue();
            return Err(e);
        }

        if let Some(runtime) = runtime {
            self.spawn_recv_routine(&runtime);
        }
        Ok(())
    }

    /// Stop the reactor and signal quit. Idempotent.
    ///
    /// Messages still queued are discarded; later enqueue attempts fail once the
    /// receive routine has exited.
    pub fn stop(&self) -> ReactorResult<()> {
        self.service.stop(|| {
            if let Some(reactor) = self.reactor.upgrade() {
                reactor.on_stop();
            }
        })?;

        self.close_unspawned_queue();
        Ok(())
    }

    /// Close the queue if no receive routine ever took ownership of it
    fn close_unspawned_queue(&self) {
        if let Some(mut receiver) = lock(&self.receiver).take() {
            receiver.close();
        }
    }

    /// Wait for the receive routine to exit. Returns immediately for synchronous
    /// reactors or if the routine was never spawned.
    pub async fn wait(&self) {
        let routine = lock(&self.routine).take();
        if let Some(routine) = routine {
            if let Err(e) = routine.await {
                warn!(reactor = %self.name(), error = %e, "Receive routine ended abnormally");
            }
        }
    }

    fn spawn_recv_routine(&self, runtime: &Handle) {
        let Some(receiver) = lock(&self.receiver).take() else {
            return;
        };

        let handle = runtime.spawn(recv_routine(
            self.name().to_string(),
            self.reactor.clone(),
            receiver,
            self.service.quit(),
        ));
        *lock(&self.routine) = Some(handle);
    }
}

impl fmt::Debug for BaseReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseReactor")
            .field("name", &self.name())
            .field("state", &self.service.state())
            .field("delivery", &self.config.delivery)
            .finish()
    }
}

impl Drop for BaseReactor {
    fn drop(&mut self) {
        if let Some(routine) = lock(&self.routine).take() {
            routine.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Receive Routine
// ----------------------------------------------------------------------------

/// Drain `receiver` one message at a time into the reactor's `receive` until quit.
///
/// Quit takes priority over pending messages, so nothing is delivered once it fires.
async fn recv_routine(
    name: String,
    reactor: Weak<dyn Reactor>,
    mut receiver: mpsc::Receiver<BufferedMessage>,
    mut quit: QuitSignal,
) {
    info!(reactor = %name, "Receive routine started");

    loop {
        tokio::select! {
            biased;

            _ = quit.fired() => {
                debug!(reactor = %name, "Quit signalled, leaving receive routine");
                break;
            }
            message = receiver.recv() => {
                let Some(message) = message else {
                    debug!(reactor = %name, "Receive queue closed");
                    break;
                };
                let Some(reactor) = reactor.upgrade() else {
                    debug!(reactor = %name, "Reactor dropped");
                    break;
                };

                let (channel_id, peer, payload) = message.into_parts();
                trace!(
                    reactor = %name,
                    channel = %channel_id,
                    peer = %peer.id(),
                    len = payload.len(),
                    "Dispatching message"
                );
                reactor.receive(channel_id, &peer, &payload);
            }
        }
    }

    receiver.close();
    info!(reactor = %name, "Receive routine stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
