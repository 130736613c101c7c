//! Host transport abstraction
//!
//! A host transport adapter registers the remote:bit service with a wireless stack and
//! translates that stack's write callbacks and notify primitive. Adapters hold no channel
//! logic: they forward peer writes to the [`PeerWriteHandler`](crate::PeerWriteHandler) they
//! were built with and push whatever the channel asks them to notify.

mod loopback;

pub use loopback::LoopbackTransport;

use std::sync::Arc;

use crate::identifiers::CharacteristicId;

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Capabilities a byte channel needs from its host transport
pub trait HostTransport: Send + Sync {
    /// Push `data` to the connected peer on `characteristic`
    ///
    /// Unacknowledged and non-blocking. Delivery failures are the adapter's to log.
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]);

    /// Whether a peer is currently connected
    fn is_connected(&self) -> bool;

    /// Short adapter name for logs
    fn name(&self) -> &'static str;
}

impl<T: HostTransport + ?Sized> HostTransport for Arc<T> {
    fn notify(&self, characteristic: CharacteristicId, data: &[u8]) {
        (**self).notify(characteristic, data)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
