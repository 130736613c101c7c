//! In-memory host transport
//!
//! Stands in for a radio: the test (or fallback) side plays the peer by toggling the
//! connection and writing bytes, and every notification the channel requests is captured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use super::HostTransport;
use crate::identifiers::CharacteristicId;
use crate::mailbox::PeerWriteHandler;

/// Loopback transport capturing notifications in memory
#[derive(Debug)]
pub struct LoopbackTransport {
    inbound: PeerWriteHandler,
    connected: AtomicBool,
    notifications: Mutex<Vec<(CharacteristicId, Vec<u8>)>>,
}

impl LoopbackTransport {
    /// Create a disconnected loopback transport feeding `inbound`
    pub fn new(inbound: PeerWriteHandler) -> Self {
        Self {
            inbound,
            connected: AtomicBool::new(false),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        debug!("Loopback peer {}", if connected { "connected" } else { "disconnected" });
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Simulate the peer writing to the inbound characteristic
    pub fn peer_write(&self, data: &[u8]) -> bool {
        self.inbound.handle(CharacteristicId::Inbound, data)
    }

    /// Simulate the peer writing to an arbitrary characteristic
    pub fn peer_write_to(&self, characteristic: CharacteristicId, data: &[u8]) -> bool {
        self.inbound.handle(characteristic, data)
    }

    /// All notifications requested so far, oldest first
    pub fn notifications(&self) -> Vec<(CharacteristicId, Vec<u8>)> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Payload of the most recent notification
    pub fn last_notification(&self) -> Option<Vec<u8>> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn clear_notifications(&self) {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl HostTransport for LoopbackTransport {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((characteristic, data.to_vec()));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}
