//! Routing of inbound component frames to application handlers

use std::collections::HashMap;

use tracing::{debug, trace};

use super::frame::{ComponentId, InboundFrame, ReceivedComponent};
use crate::channel::ByteChannel;
use crate::transport::HostTransport;

type ValuesHandler = Box<dyn Fn(&[u16]) + Send + Sync>;
type BufferHandler = Box<dyn Fn(&[u8]) + Send + Sync>;
type HandlerKey = (ReceivedComponent, ComponentId);

/// Handlers keyed by component and id
///
/// A frame may reach both a values handler and a buffer handler registered for the same
/// key. Registering again for a key replaces the previous handler.
#[derive(Default)]
pub struct RemoteDispatcher {
    values: HashMap<HandlerKey, ValuesHandler>,
    buffers: HashMap<HandlerKey, BufferHandler>,
}

impl RemoteDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_received_values<F>(&mut self, component: ReceivedComponent, id: ComponentId, handler: F)
    where
        F: Fn(&[u16]) + Send + Sync + 'static,
    {
        self.values.insert((component, id), Box::new(handler));
    }

    pub fn on_received_buffer<F>(&mut self, component: ReceivedComponent, id: ComponentId, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.buffers.insert((component, id), Box::new(handler));
    }

    /// Route one raw message, returning whether any handler ran
    pub fn dispatch(&self, raw: &[u8]) -> bool {
        let frame = match InboundFrame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping inbound message: {}", e);
                return false;
            }
        };

        let key = (frame.component, frame.id);
        let mut handled = false;

        if let Some(handler) = self.values.get(&key) {
            handler(&frame.values());
            handled = true;
        }
        if let Some(handler) = self.buffers.get(&key) {
            handler(frame.payload);
            handled = true;
        }

        if !handled {
            trace!("No handler for {:?} #{}", frame.component, frame.id.value());
        }
        handled
    }

    /// Drain the channel's pending message and route it
    pub fn poll<T: HostTransport>(&self, channel: &ByteChannel<T>) -> bool {
        match channel.read_message() {
            Some(message) => self.dispatch(&message),
            None => false,
        }
    }
}

impl core::fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemoteDispatcher")
            .field("values", &self.values.len())
            .field("buffers", &self.buffers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn routes_by_component_and_id() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = RemoteDispatcher::new();

        let sink = seen.clone();
        dispatcher.on_received_values(
            ReceivedComponent::Joystick,
            ComponentId::new(1).unwrap(),
            move |values| sink.lock().unwrap().extend_from_slice(values),
        );

        assert!(!dispatcher.dispatch(&[101, 0, 1, 0]));
        assert!(!dispatcher.dispatch(&[100, 1, 1, 0]));
        assert!(dispatcher.dispatch(&[101, 1, 0x34, 0x12]));

        assert_eq!(*seen.lock().unwrap(), vec![0x1234]);
    }

    #[test]
    fn values_and_buffer_handlers_both_run() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = RemoteDispatcher::new();
        let key = (ReceivedComponent::Button, ComponentId::new(0).unwrap());

        let sink = calls.clone();
        dispatcher.on_received_values(key.0, key.1, move |_| sink.lock().unwrap().push("values"));
        let sink = calls.clone();
        dispatcher.on_received_buffer(key.0, key.1, move |payload| {
            assert_eq!(payload, &[1]);
            sink.lock().unwrap().push("buffer");
        });

        assert!(dispatcher.dispatch(&[100, 0, 1]));
        assert_eq!(*calls.lock().unwrap(), vec!["values", "buffer"]);
    }

    #[test]
    fn malformed_messages_are_dropped() {
        let dispatcher = RemoteDispatcher::new();
        assert!(!dispatcher.dispatch(&[100]));
        assert!(!dispatcher.dispatch(&[7, 0, 0]));
    }
}
