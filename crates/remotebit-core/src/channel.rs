//! The byte channel service
//!
//! [`ByteChannel`] is the application's view of the remote:bit service. `write` pushes at
//! most one packet to the connected peer and `read` drains the single pending peer message.
//! Neither call blocks or fails: oversized writes are truncated to the capacity, writes
//! without a connected peer are dropped, and reads with nothing pending return zero.

use std::sync::{Arc, Mutex};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::events::ChannelEvent;
use crate::identifiers::CharacteristicId;
use crate::mailbox::{InboundMailbox, MessageBytes};
use crate::transport::HostTransport;

// ----------------------------------------------------------------------------
// Byte Channel
// ----------------------------------------------------------------------------

/// Bidirectional single-packet byte channel over a host transport
pub struct ByteChannel<T: HostTransport> {
    transport: T,
    mailbox: Arc<InboundMailbox>,
    /// Last packet handed to the transport
    outbound: Mutex<MessageBytes>,
}

impl<T: HostTransport> ByteChannel<T> {
    /// Create a channel over `transport`, draining `mailbox`
    ///
    /// The mailbox must be the one whose handler the transport was built with. Its capacity
    /// bounds both directions.
    pub fn new(transport: T, mailbox: Arc<InboundMailbox>) -> Self {
        debug!(
            "Byte channel ready on {} transport (capacity {})",
            transport.name(),
            mailbox.capacity()
        );
        Self {
            transport,
            mailbox,
            outbound: Mutex::new(SmallVec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn mailbox(&self) -> &Arc<InboundMailbox> {
        &self.mailbox
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Send `data` to the connected peer
    ///
    /// Without a connected peer the bytes are dropped. Anything past the capacity is cut
    /// off. The notification is fire-and-forget.
    pub fn write(&self, data: &[u8]) {
        if !self.transport.is_connected() {
            trace!("No peer connected, dropping {} bytes", data.len());
            return;
        }

        let len = data.len().min(self.capacity());
        if len < data.len() {
            debug!("Truncating outbound write from {} to {} bytes", data.len(), len);
        }

        let mut outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        outbound.clear();
        outbound.extend_from_slice(&data[..len]);

        trace!("Notifying {}", hex::encode(&outbound[..]));
        self.transport.notify(CharacteristicId::Outbound, &outbound);
    }

    /// Drain the pending peer message into `out`
    ///
    /// Returns the number of bytes copied, zero when nothing is pending. A message longer
    /// than `out` is cut to `out.len()` and still consumed. An empty `out` returns zero and
    /// leaves the message pending.
    pub fn read(&self, out: &mut [u8]) -> usize {
        self.mailbox.take_into(out)
    }

    /// Drain the pending peer message as owned bytes
    pub fn read_message(&self) -> Option<MessageBytes> {
        self.mailbox.take()
    }

    pub fn has_pending(&self) -> bool {
        self.mailbox.has_pending()
    }

    /// Copy of the last packet handed to the transport
    pub fn outbound_snapshot(&self) -> MessageBytes {
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Register a listener for channel events
    pub fn on_event<F>(&self, hook: F)
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.mailbox.hooks().register(hook);
    }
}

impl<T: HostTransport> core::fmt::Debug for ByteChannel<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteChannel")
            .field("transport", &self.transport.name())
            .field("capacity", &self.capacity())
            .field("pending", &self.mailbox.pending_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ServiceLayout;
    use crate::transport::LoopbackTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loopback(capacity: usize) -> (Arc<LoopbackTransport>, ByteChannel<Arc<LoopbackTransport>>) {
        let mailbox = InboundMailbox::new(capacity);
        let transport = Arc::new(LoopbackTransport::new(mailbox.handler(ServiceLayout::default())));
        let channel = ByteChannel::new(transport.clone(), mailbox);
        (transport, channel)
    }

    #[test]
    fn reference_scenario() {
        let (transport, channel) = loopback(20);

        transport.peer_write(&[0x01, 0x02, 0x03]);
        let mut buf = [0u8; 20];
        assert_eq!(channel.read(&mut buf), 3);
        assert_eq!(&buf[..3], &[0x01, 0x02, 0x03]);
        assert_eq!(channel.read(&mut buf), 0);

        transport.set_connected(true);
        channel.write(&[0xAA; 25]);
        assert_eq!(transport.last_notification(), Some(vec![0xAA; 20]));
    }

    #[test]
    fn write_while_disconnected_is_dropped() {
        let (transport, channel) = loopback(20);

        transport.set_connected(true);
        channel.write(b"first");
        transport.set_connected(false);
        channel.write(b"second");

        assert_eq!(transport.notifications().len(), 1);
        assert_eq!(channel.outbound_snapshot().as_slice(), b"first");
    }

    #[test]
    fn notifications_target_the_outbound_characteristic() {
        let (transport, channel) = loopback(20);
        transport.set_connected(true);
        channel.write(&[1, 2]);

        let (characteristic, payload) = transport.notifications().remove(0);
        assert_eq!(characteristic, CharacteristicId::Outbound);
        assert_eq!(payload, vec![1, 2]);
    }

    #[test]
    fn last_write_wins_before_read() {
        let (transport, channel) = loopback(20);

        transport.peer_write(b"one");
        transport.peer_write(b"two!");

        assert_eq!(channel.read_message().unwrap().as_slice(), b"two!");
        assert!(channel.read_message().is_none());
    }

    #[test]
    fn disconnect_keeps_pending_message() {
        let (transport, channel) = loopback(20);
        transport.set_connected(true);
        transport.peer_write(&[5]);
        transport.set_connected(false);

        assert!(channel.has_pending());
        assert_eq!(channel.read_message().unwrap().as_slice(), &[5]);
    }

    #[test]
    fn one_event_per_accepted_write() {
        let (transport, channel) = loopback(20);
        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        channel.on_event(move |event| {
            assert!(matches!(event, ChannelEvent::DataReceived { .. }));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        transport.peer_write(&[1]);
        transport.peer_write(&[]);
        transport.peer_write(&[2, 3]);

        assert_eq!(events.load(Ordering::SeqCst), 2);
    }
}
