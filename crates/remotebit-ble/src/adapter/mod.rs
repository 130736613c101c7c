//! Host transport adapters and platform selection

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;

use remotebit_core::{
    ByteChannel, ChannelConfig, CharacteristicId, HostTransport, InboundMailbox, PeerWriteHandler,
    Result as RemoteBitResult,
};
use tracing::info;

use crate::error::BleTransportError;

// ----------------------------------------------------------------------------
// Adapter Setup Trait
// ----------------------------------------------------------------------------

/// Bring-up of a host transport adapter
///
/// `register` publishes the service, starts advertising when the configuration asks for it
/// and wires every peer write into `inbound`. Dropping the adapter withdraws the service.
#[async_trait::async_trait]
pub trait TransportSetup: HostTransport + Sized {
    async fn register(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Result<Self, BleTransportError>;

    /// Check if currently advertising
    fn is_advertising(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Platform Detection and Factory
// ----------------------------------------------------------------------------

/// Platform-specific host transport
pub enum PlatformTransport {
    #[cfg(target_os = "linux")]
    Linux(linux::BluezTransport),
    #[cfg(target_os = "macos")]
    MacOS(macos::CoreBluetoothTransport),
    #[allow(dead_code)]
    Fallback(fallback::FallbackTransport),
}

#[async_trait::async_trait]
impl TransportSetup for PlatformTransport {
    async fn register(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Result<Self, BleTransportError> {
        #[cfg(target_os = "linux")]
        {
            linux::BluezTransport::register(config, inbound)
                .await
                .map(Self::Linux)
        }
        #[cfg(target_os = "macos")]
        {
            macos::CoreBluetoothTransport::register(config, inbound)
                .await
                .map(Self::MacOS)
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            fallback::FallbackTransport::register(config, inbound)
                .await
                .map(Self::Fallback)
        }
    }

    fn is_advertising(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref transport) => transport.is_advertising(),
            #[cfg(target_os = "macos")]
            Self::MacOS(ref transport) => transport.is_advertising(),
            Self::Fallback(ref transport) => transport.is_advertising(),
        }
    }
}

impl HostTransport for PlatformTransport {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref transport) => transport.notify(characteristic, data),
            #[cfg(target_os = "macos")]
            Self::MacOS(ref transport) => transport.notify(characteristic, data),
            Self::Fallback(ref transport) => transport.notify(characteristic, data),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref transport) => transport.is_connected(),
            #[cfg(target_os = "macos")]
            Self::MacOS(ref transport) => transport.is_connected(),
            Self::Fallback(ref transport) => transport.is_connected(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref transport) => transport.name(),
            #[cfg(target_os = "macos")]
            Self::MacOS(ref transport) => transport.name(),
            Self::Fallback(ref transport) => transport.name(),
        }
    }
}

// ----------------------------------------------------------------------------
// Service Entry Point
// ----------------------------------------------------------------------------

/// Register the remote:bit service on this platform's radio
///
/// Validates `config`, creates the inbound mailbox, brings up the platform adapter and
/// returns the channel the application polls.
pub async fn start_service(config: ChannelConfig) -> RemoteBitResult<ByteChannel<PlatformTransport>> {
    start_with::<PlatformTransport>(config).await
}

/// Register the remote:bit service on a specific adapter
pub async fn start_with<T: TransportSetup>(config: ChannelConfig) -> RemoteBitResult<ByteChannel<T>> {
    config.validate()?;

    let mailbox = InboundMailbox::new(config.capacity);
    let transport = T::register(&config, mailbox.handler(config.layout)).await?;
    info!(
        "remote:bit service {} registered on {} transport",
        config.layout.service_uuid(),
        transport.name()
    );

    Ok(ByteChannel::new(transport, mailbox))
}
