//! Bluetooth Low Energy host adapters for remote:bit
//!
//! This crate brings the `remotebit-core` byte channel onto a real radio. Each adapter
//! registers the remote:bit GATT service as a peripheral, feeds peer writes into the
//! core's inbound mailbox and turns application writes into notifications.
//!
//! ## Architecture
//!
//! - [`adapter`] - Platform adapters, selection and the [`start_service`] entry point
//! - [`error`] - Error types specific to the BLE adapters
//! - [`protocol`] - BLE naming and security helpers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use remotebit_ble::start_service;
//! use remotebit_core::ChannelConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ChannelConfig::new().with_device_name_prefix("robot".to_string());
//! let channel = start_service(config).await?;
//!
//! let mut buf = [0u8; 20];
//! if channel.read(&mut buf) > 0 {
//!     channel.write(&buf);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! - **Linux**: GATT application and advertisement via the `bluer` crate (BlueZ)
//! - **macOS**: Core Bluetooth via CBPeripheralManager
//! - **Other platforms**: Fallback adapter that is never connected

pub mod adapter;
mod error;
mod protocol;

// Public API exports
pub use adapter::fallback::FallbackTransport;
#[cfg(target_os = "linux")]
pub use adapter::linux::BluezTransport;
#[cfg(target_os = "macos")]
pub use adapter::macos::CoreBluetoothTransport;
pub use adapter::{start_service, start_with, PlatformTransport, TransportSetup};
pub use error::BleTransportError;
pub use protocol::{generate_device_name, requires_encryption};

// Re-export the HostTransport trait for convenience
pub use remotebit_core::HostTransport;
