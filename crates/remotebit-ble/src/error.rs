//! Error types for the BLE host adapters

use remotebit_core::RemoteBitError;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised while bringing up a BLE host adapter
#[derive(Error, Debug)]
pub enum BleTransportError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Failed to open Bluetooth session: {0}")]
    SessionFailed(String),

    #[error("Failed to power on adapter: {0}")]
    PowerOnFailed(String),

    #[error("Failed to register GATT service: {0}")]
    ServiceRegistrationFailed(String),

    #[error("Failed to start advertising: {0}")]
    AdvertisingFailed(String),

    #[error("Platform class not available: {class}")]
    ClassNotAvailable { class: &'static str },

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] RemoteBitError),
}

impl From<BleTransportError> for RemoteBitError {
    fn from(err: BleTransportError) -> Self {
        match err {
            BleTransportError::Configuration(inner) => inner,
            BleTransportError::AdapterNotAvailable
            | BleTransportError::SessionFailed(_)
            | BleTransportError::PowerOnFailed(_)
            | BleTransportError::ClassNotAvailable { .. } => RemoteBitError::TransportUnavailable {
                transport_type: err.to_string(),
            },
            BleTransportError::ServiceRegistrationFailed(reason) => {
                RemoteBitError::RegistrationFailed { reason }
            }
            BleTransportError::AdvertisingFailed(reason) => {
                RemoteBitError::AdvertisingFailed { reason }
            }
        }
    }
}
