//! Fallback host transport for platforms without a supported radio

use remotebit_core::{
    ChannelConfig, CharacteristicId, HostTransport, LoopbackTransport, PeerWriteHandler,
};
use tracing::warn;

use crate::error::BleTransportError;
use crate::protocol::generate_device_name;

use super::TransportSetup;

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

/// In-memory stand-in used where no BLE peripheral support exists
///
/// Never connected, so every application write is dropped. Peer writes can still be
/// simulated through [`FallbackTransport::loopback`].
#[derive(Debug)]
pub struct FallbackTransport {
    loopback: LoopbackTransport,
}

impl FallbackTransport {
    pub fn new(inbound: PeerWriteHandler) -> Self {
        Self {
            loopback: LoopbackTransport::new(inbound),
        }
    }

    pub fn loopback(&self) -> &LoopbackTransport {
        &self.loopback
    }
}

#[async_trait::async_trait]
impl TransportSetup for FallbackTransport {
    async fn register(
        config: &ChannelConfig,
        inbound: PeerWriteHandler,
    ) -> Result<Self, BleTransportError> {
        let device_name = generate_device_name(&config.device_name_prefix, &[]);
        warn!(
            "BLE peripheral mode not supported on this platform. Device '{}' will not be discoverable. \
            Consider using a supported platform (Linux with BlueZ or macOS) for full functionality.",
            device_name
        );
        Ok(Self::new(inbound))
    }

    fn is_advertising(&self) -> bool {
        false
    }
}

impl HostTransport for FallbackTransport {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        self.loopback.notify(characteristic, data);
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::start_with;

    #[tokio::test]
    async fn fallback_service_drops_writes_but_accepts_peer_bytes() {
        let channel = start_with::<FallbackTransport>(ChannelConfig::default())
            .await
            .unwrap();

        assert!(!channel.is_connected());
        assert!(!channel.transport().is_advertising());

        channel.write(b"hello");
        assert!(channel.transport().loopback().notifications().is_empty());

        channel.transport().loopback().peer_write(&[1, 2, 3]);
        let mut buf = [0u8; 20];
        assert_eq!(channel.read(&mut buf), 3);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = ChannelConfig::default().with_capacity(0);
        let result = tokio_test::block_on(start_with::<FallbackTransport>(config));
        assert!(result.is_err());
    }
}
