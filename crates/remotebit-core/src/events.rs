//! Application signalling
//!
//! The byte channel does not own an event bus. It raises a typed [`ChannelEvent`] through
//! registered hooks and leaves it to the application to forward that into whatever wakes
//! its polling loop (a `tokio::sync::Notify`, a numeric platform event bus, a channel).

use std::sync::{Arc, RwLock};

use tracing::trace;

// ----------------------------------------------------------------------------
// Event Bus Identifiers
// ----------------------------------------------------------------------------

/// Event source identifier used by the remote:bit service on numeric event buses
pub const EVENT_SOURCE_ID: u16 = 2300;

/// Event value signalling that a peer message is waiting in the mailbox
pub const EVENT_DATA_RECEIVED: u16 = 60;

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Events raised by the byte channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A peer message of `len` bytes was accepted into the mailbox
    DataReceived { len: usize },
}

impl ChannelEvent {
    /// `(source, value)` pair for numeric event buses
    pub fn bus_id(&self) -> (u16, u16) {
        match self {
            ChannelEvent::DataReceived { .. } => (EVENT_SOURCE_ID, EVENT_DATA_RECEIVED),
        }
    }
}

type Hook = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

// ----------------------------------------------------------------------------
// Hook Registry
// ----------------------------------------------------------------------------

/// Registered listeners for channel events
///
/// Hooks run synchronously on the context that raised the event, which for inbound data
/// is the transport adapter's callback context. They should hand off quickly.
#[derive(Default)]
pub struct EventHooks {
    hooks: RwLock<Vec<Hook>>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays registered for the lifetime of the registry
    pub fn register<F>(&self, hook: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener
    pub fn emit(&self, event: ChannelEvent) {
        // Snapshot so a hook may register further hooks without deadlocking
        let hooks: Vec<Hook> = self
            .hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        trace!("Emitting {:?} to {} hook(s)", event, hooks.len());
        for hook in hooks {
            hook(&event);
        }
    }
}

impl core::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventHooks").field("hooks", &self.len()).finish()
    }
}
