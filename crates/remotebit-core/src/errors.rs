//! Error types for remote:bit
//!
//! The application-facing byte channel never reports errors: oversized writes are
//! truncated, writes without a peer are dropped and empty reads return zero. The types here
//! cover the places where failure is real - validating configuration, bringing up a host
//! transport and decoding remote:bit component frames.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Frame Errors
// ----------------------------------------------------------------------------

/// Errors produced while decoding a remote:bit component frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame too short: {len} bytes (min: 2)")]
    TooShort { len: usize },

    #[error("Unknown component code: {code}")]
    UnknownComponent { code: u8 },

    #[error("Component id out of range: {id} (max: 15)")]
    InvalidComponentId { id: u8 },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for remote:bit setup and configuration
#[derive(Debug, Error)]
pub enum RemoteBitError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Transport is not available: {transport_type}")]
    TransportUnavailable { transport_type: String },

    #[error("Service registration failed: {reason}")]
    RegistrationFailed { reason: String },

    #[error("Advertising failed: {reason}")]
    AdvertisingFailed { reason: String },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

impl RemoteBitError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, RemoteBitError>;
