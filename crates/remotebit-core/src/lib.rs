//! remote:bit Core
//!
//! This crate provides the platform-independent half of the remote:bit byte channel: a
//! single-slot inbound mailbox fed by an asynchronous GATT transport, a polled
//! application-facing [`ByteChannel`], and the [`HostTransport`] seam that platform adapters
//! implement.
//!
//! ## Architecture
//!
//! - [`config`] - Channel configuration and settings
//! - [`errors`] - Setup and configuration error types
//! - [`identifiers`] - Base UUID + short code addressing for the service
//! - [`mailbox`] - Single-slot inbound buffer shared with the transport context
//! - [`events`] - "Data received" signalling towards the application
//! - [`channel`] - The byte channel service itself
//! - [`transport`] - Host transport trait and the in-memory loopback adapter
//! - [`remote`] - remote:bit component frames layered on the byte channel
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use remotebit_core::{ByteChannel, ChannelConfig, InboundMailbox, LoopbackTransport};
//!
//! let config = ChannelConfig::default();
//! let mailbox = InboundMailbox::new(config.capacity);
//! let transport = Arc::new(LoopbackTransport::new(mailbox.handler(config.layout)));
//! let channel = ByteChannel::new(transport.clone(), mailbox);
//!
//! transport.peer_write(&[0x01, 0x02, 0x03]);
//!
//! let mut buf = [0u8; 20];
//! assert_eq!(channel.read(&mut buf), 3);
//! assert_eq!(channel.read(&mut buf), 0);
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod channel;
pub mod config;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod mailbox;
pub mod remote;
pub mod transport;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::ByteChannel;
pub use config::{ChannelConfig, SecurityLevel, TxPower, DEFAULT_PACKET_SIZE, MAX_PACKET_SIZE};
pub use errors::{RemoteBitError, Result};
pub use events::{ChannelEvent, EventHooks, EVENT_DATA_RECEIVED, EVENT_SOURCE_ID};
pub use identifiers::{CharacteristicId, ServiceLayout, UuidBase};
pub use mailbox::{InboundMailbox, PeerWriteHandler};
pub use remote::{ComponentId, ReceivedComponent, RemoteBit, RemoteDispatcher, SendComponent};
pub use transport::{HostTransport, LoopbackTransport};
