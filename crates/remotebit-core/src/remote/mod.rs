//! remote:bit component protocol
//!
//! Thin layer over [`ByteChannel`] that addresses remote:bit components. Outbound frames
//! carry a [`SendComponent`], inbound frames are routed by [`ReceivedComponent`] and
//! [`ComponentId`] through a [`RemoteDispatcher`].

pub mod dispatcher;
pub mod frame;

pub use dispatcher::RemoteDispatcher;
pub use frame::{
    encode_buffer, encode_values, ComponentId, InboundFrame, ReceivedComponent, SendComponent,
    MAX_COMPONENT_ID,
};

use tracing::trace;

use crate::channel::ByteChannel;
use crate::transport::HostTransport;

/// remote:bit endpoint over a byte channel
#[derive(Debug)]
pub struct RemoteBit<T: HostTransport> {
    channel: ByteChannel<T>,
    dispatcher: RemoteDispatcher,
}

impl<T: HostTransport> RemoteBit<T> {
    pub fn new(channel: ByteChannel<T>) -> Self {
        Self {
            channel,
            dispatcher: RemoteDispatcher::new(),
        }
    }

    pub fn channel(&self) -> &ByteChannel<T> {
        &self.channel
    }

    pub fn dispatcher(&self) -> &RemoteDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut RemoteDispatcher {
        &mut self.dispatcher
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Send `values` for a component, truncated to the channel capacity
    pub fn send_values(&self, component: SendComponent, id: ComponentId, values: &[u16]) {
        let frame = encode_values(component, id, values);
        trace!("Sending {:?} #{} values {:?}", component, id.value(), values);
        self.channel.write(&frame);
    }

    /// Send raw bytes for a component, truncated to the channel capacity
    pub fn send_buffer(&self, component: SendComponent, id: ComponentId, bytes: &[u8]) {
        let frame = encode_buffer(component, id, bytes);
        trace!("Sending {:?} #{} buffer of {} bytes", component, id.value(), bytes.len());
        self.channel.write(&frame);
    }

    pub fn on_received_values<F>(&mut self, component: ReceivedComponent, id: ComponentId, handler: F)
    where
        F: Fn(&[u16]) + Send + Sync + 'static,
    {
        self.dispatcher.on_received_values(component, id, handler);
    }

    pub fn on_received_buffer<F>(&mut self, component: ReceivedComponent, id: ComponentId, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.dispatcher.on_received_buffer(component, id, handler);
    }

    /// Route the pending inbound message, if any
    pub fn poll(&self) -> bool {
        self.dispatcher.poll(&self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ServiceLayout;
    use crate::mailbox::InboundMailbox;
    use crate::transport::LoopbackTransport;
    use std::sync::{Arc, Mutex};

    fn remote() -> (Arc<LoopbackTransport>, RemoteBit<Arc<LoopbackTransport>>) {
        let mailbox = InboundMailbox::new(20);
        let transport = Arc::new(LoopbackTransport::new(mailbox.handler(ServiceLayout::default())));
        let remote = RemoteBit::new(ByteChannel::new(transport.clone(), mailbox));
        (transport, remote)
    }

    #[test]
    fn speed_values_reach_the_peer() {
        let (transport, remote) = remote();
        transport.set_connected(true);

        remote.send_values(SendComponent::Speed, ComponentId::new(0).unwrap(), &[300]);

        assert_eq!(transport.last_notification(), Some(vec![100, 0, 0x2C, 0x01]));
    }

    #[test]
    fn oversized_buffer_is_cut_to_capacity() {
        let (transport, remote) = remote();
        transport.set_connected(true);

        remote.send_buffer(SendComponent::Distance, ComponentId::new(4).unwrap(), &[9; 30]);

        let sent = transport.last_notification().unwrap();
        assert_eq!(sent.len(), 20);
        assert_eq!(&sent[..2], &[101, 4]);
    }

    #[test]
    fn poll_routes_button_presses() {
        let (transport, mut remote) = remote();
        let pressed = Arc::new(Mutex::new(None));
        let sink = pressed.clone();
        remote.on_received_values(ReceivedComponent::Button, ComponentId::new(2).unwrap(), move |v| {
            *sink.lock().unwrap() = v.first().copied();
        });

        assert!(!remote.poll());
        transport.peer_write(&[100, 2, 1, 0]);
        assert!(remote.poll());
        assert_eq!(*pressed.lock().unwrap(), Some(1));
        assert!(!remote.poll());
    }
}
