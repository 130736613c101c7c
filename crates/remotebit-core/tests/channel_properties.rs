//! Property-based tests for the byte channel
//!
//! These tests verify the channel's observable guarantees: bounded message size, drain on
//! read, last-write-wins, and the disconnected-write drop.

use proptest::prelude::*;
use remotebit_core::{
    ByteChannel, ChannelConfig, CharacteristicId, InboundMailbox, LoopbackTransport,
};
use std::sync::Arc;

type TestChannel = ByteChannel<Arc<LoopbackTransport>>;

/// Route channel logs to the test harness output
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn setup(capacity: usize) -> (Arc<LoopbackTransport>, TestChannel) {
    init_tracing();
    let config = ChannelConfig::default().with_capacity(capacity);
    let mailbox = InboundMailbox::new(config.capacity);
    let transport = Arc::new(LoopbackTransport::new(mailbox.handler(config.layout)));
    let channel = ByteChannel::new(transport.clone(), mailbox);
    (transport, channel)
}

/// Generate a channel capacity
fn arb_capacity() -> impl Strategy<Value = usize> {
    1usize..=64
}

/// Generate a non-empty peer write, possibly larger than the capacity
fn arb_write() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=96)
}

proptest! {
    /// Property: A read never returns more than the capacity
    #[test]
    fn read_is_bounded_by_capacity(capacity in arb_capacity(), data in arb_write()) {
        let (transport, channel) = setup(capacity);
        transport.peer_write(&data);

        let mut buf = vec![0u8; 128];
        let n = channel.read(&mut buf);

        prop_assert_eq!(n, data.len().min(capacity));
        prop_assert_eq!(&buf[..n], &data[..n]);
    }

    /// Property: A read drains the slot
    #[test]
    fn second_read_returns_nothing(data in arb_write()) {
        let (transport, channel) = setup(20);
        transport.peer_write(&data);

        let mut buf = [0u8; 20];
        channel.read(&mut buf);
        prop_assert_eq!(channel.read(&mut buf), 0);
    }

    /// Property: Of several unread writes only the last is observed
    #[test]
    fn last_write_wins(writes in prop::collection::vec(arb_write(), 1..8)) {
        let (transport, channel) = setup(20);
        for write in &writes {
            transport.peer_write(write);
        }

        let last = writes.last().unwrap();
        let expected = &last[..last.len().min(20)];
        let message = channel.read_message().unwrap();
        prop_assert_eq!(message.as_slice(), expected);
    }

    /// Property: Outbound packets are the prefix of the write, up to the capacity
    #[test]
    fn write_truncates_to_capacity(capacity in arb_capacity(), data in arb_write()) {
        let (transport, channel) = setup(capacity);
        transport.set_connected(true);
        channel.write(&data);

        let notifications = transport.notifications();
        prop_assert_eq!(notifications.len(), 1);
        let (characteristic, payload) = &notifications[0];
        prop_assert_eq!(*characteristic, CharacteristicId::Outbound);
        prop_assert_eq!(payload.as_slice(), &data[..data.len().min(capacity)]);
    }

    /// Property: Nothing reaches the transport while disconnected
    #[test]
    fn disconnected_writes_never_notify(writes in prop::collection::vec(arb_write(), 0..8)) {
        let (transport, channel) = setup(20);
        for write in &writes {
            channel.write(write);
        }
        prop_assert!(transport.notifications().is_empty());
    }

    /// Property: A short read buffer gets a prefix and the message is still consumed
    #[test]
    fn short_read_buffer_truncates_and_drains(data in arb_write(), out_len in 1usize..20) {
        let (transport, channel) = setup(20);
        transport.peer_write(&data);
        let stored = data.len().min(20);

        let mut buf = vec![0u8; out_len];
        let n = channel.read(&mut buf);

        prop_assert_eq!(n, stored.min(out_len));
        prop_assert_eq!(&buf[..n], &data[..n]);
        prop_assert!(!channel.has_pending());
    }
}

#[test]
fn reference_scenario() {
    let (transport, channel) = setup(20);

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
fn writes_to_the_outbound_characteristic_are_ignored() {
    let (transport, channel) = setup(20);

    assert!(!transport.peer_write_to(CharacteristicId::Outbound, &[1, 2, 3]));
    assert!(!channel.has_pending());
}

#[test]
fn empty_read_buffer_keeps_the_message() {
    let (transport, channel) = setup(20);
    transport.peer_write(&[4, 5, 6]);

    assert_eq!(channel.read(&mut []), 0);
    assert!(channel.has_pending());

    let mut buf = [0u8; 20];
    assert_eq!(channel.read(&mut buf), 3);
}

#[test]
fn zero_capacity_mailbox_delivers_what_it_announces() {
    init_tracing();
    let mailbox = InboundMailbox::new(0);
    let transport = Arc::new(LoopbackTransport::new(
        mailbox.handler(ChannelConfig::default().layout),
    ));
    let channel = ByteChannel::new(transport.clone(), mailbox);

    let announced = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = announced.clone();
    channel.on_event(move |event| {
        let remotebit_core::ChannelEvent::DataReceived { len } = event;
        sink.lock().unwrap().push(*len);
    });

    assert!(transport.peer_write(&[1, 2, 3]));

    let mut buf = [0u8; 8];
    let n = channel.read(&mut buf);
    assert_eq!(*announced.lock().unwrap(), vec![n]);
    assert_eq!(&buf[..n], &[1]);
}
