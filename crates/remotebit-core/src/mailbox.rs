//! Single-slot inbound mailbox
//!
//! Peer writes arrive on the transport adapter's execution context (a BlueZ callback task,
//! a CoreBluetooth dispatch queue) while the application drains them from its own thread.
//! The slot holds at most one message: a newer write replaces an unread one, a read empties
//! it. The bytes and their count live behind a single mutex so a read can never observe a
//! message that a concurrent write is halfway through replacing.

use std::sync::{Arc, Mutex, MutexGuard};

use smallvec::SmallVec;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::DEFAULT_PACKET_SIZE;
use crate::events::{ChannelEvent, EventHooks};
use crate::identifiers::{CharacteristicId, ServiceLayout};

/// Message bytes, inline up to the reference packet size
pub type MessageBytes = SmallVec<[u8; DEFAULT_PACKET_SIZE]>;

// ----------------------------------------------------------------------------
// Mailbox
// ----------------------------------------------------------------------------

/// Bounded single-message buffer shared between a transport adapter and the application
#[derive(Debug)]
pub struct InboundMailbox {
    capacity: usize,
    /// Pending message; empty means nothing is pending
    slot: Mutex<MessageBytes>,
    hooks: EventHooks,
}

impl InboundMailbox {
    /// Create a mailbox holding messages of at most `capacity` bytes
    ///
    /// A zero capacity is raised to one byte so every accepted write leaves a message.
    pub fn new(capacity: usize) -> Arc<Self> {
        if capacity == 0 {
            warn!("Mailbox capacity of zero raised to 1 byte");
        }
        Arc::new(Self {
            capacity: capacity.max(1),
            slot: Mutex::new(SmallVec::new()),
            hooks: EventHooks::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Listeners notified once per accepted peer write
    pub fn hooks(&self) -> &EventHooks {
        &self.hooks
    }

    /// Handler given to a transport adapter to feed this mailbox
    pub fn handler(self: &Arc<Self>, layout: ServiceLayout) -> PeerWriteHandler {
        PeerWriteHandler {
            mailbox: Arc::clone(self),
            layout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MessageBytes> {
        // A panicking hook cannot leave the slot half-written: hooks run outside the lock
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a message written by the peer
    ///
    /// Empty writes are ignored. Bytes beyond the capacity are cut off. Returns whether the
    /// write was accepted; each accepted write raises exactly one
    /// [`ChannelEvent::DataReceived`].
    pub fn on_peer_write(&self, data: &[u8]) -> bool {
        if data.is_empty() {
            trace!("Ignoring empty peer write");
            return false;
        }

        let accepted = if data.len() > self.capacity {
            warn!(
                "Peer wrote {} bytes, keeping the first {} (capacity)",
                data.len(),
                self.capacity
            );
            &data[..self.capacity]
        } else {
            data
        };

        {
            let mut slot = self.lock();
            if !slot.is_empty() {
                debug!("Replacing unread message of {} bytes", slot.len());
            }
            slot.clear();
            slot.extend_from_slice(accepted);
        }

        trace!("Peer message: {}", hex::encode(accepted));
        self.hooks.emit(ChannelEvent::DataReceived {
            len: accepted.len(),
        });
        true
    }

    /// Drain the pending message into `out`, returning the number of bytes copied
    ///
    /// When `out` is shorter than the pending message only `out.len()` bytes are copied and
    /// the remainder is discarded; the message is drained either way. An empty `out` copies
    /// nothing and leaves the message pending.
    pub fn take_into(&self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let mut slot = self.lock();
        if slot.is_empty() {
            return 0;
        }

        let copied = slot.len().min(out.len());
        if copied < slot.len() {
            warn!(
                "Read buffer of {} bytes is too small for pending message of {} bytes",
                out.len(),
                slot.len()
            );
        }
        out[..copied].copy_from_slice(&slot[..copied]);
        slot.clear();
        copied
    }

    /// Drain the pending message as owned bytes
    pub fn take(&self) -> Option<MessageBytes> {
        let mut slot = self.lock();
        if slot.is_empty() {
            None
        } else {
            Some(core::mem::take(&mut *slot))
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_len() > 0
    }
}

// ----------------------------------------------------------------------------
// Adapter-facing Handler
// ----------------------------------------------------------------------------

/// Inbound entry point handed to a host transport adapter
///
/// Adapters report every peer write together with the characteristic it targeted; writes
/// to anything other than the inbound characteristic are ignored.
#[derive(Debug, Clone)]
pub struct PeerWriteHandler {
    mailbox: Arc<InboundMailbox>,
    layout: ServiceLayout,
}

impl PeerWriteHandler {
    pub fn layout(&self) -> &ServiceLayout {
        &self.layout
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// Deliver a peer write addressed by characteristic role
    pub fn handle(&self, characteristic: CharacteristicId, data: &[u8]) -> bool {
        match characteristic {
            CharacteristicId::Inbound => self.mailbox.on_peer_write(data),
            CharacteristicId::Outbound => {
                debug!("Ignoring peer write to the notify-only characteristic");
                false
            }
        }
    }

    /// Deliver a peer write addressed by characteristic UUID
    pub fn handle_uuid(&self, uuid: &Uuid, data: &[u8]) -> bool {
        match self.layout.identify(uuid) {
            Some(characteristic) => self.handle(characteristic, data),
            None => {
                debug!("Ignoring peer write to unknown characteristic {}", uuid);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn write_then_drain() {
        let mailbox = InboundMailbox::new(20);
        assert!(mailbox.on_peer_write(&[0x01, 0x02, 0x03]));
        assert!(mailbox.has_pending());

        let mut out = [0u8; 20];
        assert_eq!(mailbox.take_into(&mut out), 3);
        assert_eq!(&out[..3], &[0x01, 0x02, 0x03]);
        assert_eq!(mailbox.take_into(&mut out), 0);
    }

    #[test]
    fn empty_write_is_ignored_and_silent() {
        let mailbox = InboundMailbox::new(20);
        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        mailbox.hooks().register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!mailbox.on_peer_write(&[]));
        assert_eq!(events.load(Ordering::SeqCst), 0);
        assert!(!mailbox.has_pending());
    }

    #[test]
    fn oversized_peer_write_is_bounded() {
        let mailbox = InboundMailbox::new(4);
        mailbox.on_peer_write(&[9, 8, 7, 6, 5, 4]);

        assert_eq!(mailbox.pending_len(), 4);
        assert_eq!(mailbox.take().unwrap().as_slice(), &[9, 8, 7, 6]);
    }

    #[test]
    fn short_destination_still_drains() {
        let mailbox = InboundMailbox::new(20);
        mailbox.on_peer_write(&[1, 2, 3, 4, 5]);

        let mut out = [0u8; 2];
        assert_eq!(mailbox.take_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert!(!mailbox.has_pending());
    }

    #[test]
    fn zero_capacity_still_keeps_one_byte() {
        let mailbox = InboundMailbox::new(0);
        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        mailbox.hooks().register(move |event| {
            assert_eq!(*event, ChannelEvent::DataReceived { len: 1 });
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(mailbox.capacity(), 1);
        assert!(mailbox.on_peer_write(&[1, 2, 3]));
        assert_eq!(events.load(Ordering::SeqCst), 1);

        let mut out = [0u8; 4];
        assert_eq!(mailbox.take_into(&mut out), 1);
        assert_eq!(out[0], 1);
    }

    #[test]
    fn empty_destination_leaves_message_pending() {
        let mailbox = InboundMailbox::new(20);
        mailbox.on_peer_write(&[7, 8]);

        assert_eq!(mailbox.take_into(&mut []), 0);
        assert!(mailbox.has_pending());
        assert_eq!(mailbox.take().unwrap().as_slice(), &[7, 8]);
    }

    #[test]
    fn hook_can_drain_from_inside_event() {
        let mailbox = InboundMailbox::new(20);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = mailbox.clone();
        let sink = seen.clone();
        mailbox.hooks().register(move |_| {
            if let Some(bytes) = inner.take() {
                sink.lock().unwrap().push(bytes.to_vec());
            }
        });

        mailbox.on_peer_write(b"hi");
        assert_eq!(*seen.lock().unwrap(), vec![b"hi".to_vec()]);
    }

    #[test]
    fn handler_filters_by_characteristic() {
        let mailbox = InboundMailbox::new(20);
        let layout = ServiceLayout::default();
        let handler = mailbox.handler(layout);

        assert!(!handler.handle(CharacteristicId::Outbound, &[1]));
        assert!(!handler.handle_uuid(&layout.service_uuid(), &[1]));
        assert!(!mailbox.has_pending());

        let rx = layout.characteristic_uuid(CharacteristicId::Inbound);
        assert!(handler.handle_uuid(&rx, &[1]));
        assert_eq!(mailbox.pending_len(), 1);
    }
}
