//! Byte channel configuration

use serde::{Deserialize, Serialize};

use crate::errors::{RemoteBitError, Result};
use crate::identifiers::ServiceLayout;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Declared length of both characteristics in the reference service
pub const DEFAULT_PACKET_SIZE: usize = 20;

/// Largest attribute value ATT allows
pub const MAX_PACKET_SIZE: usize = 512;

/// Output power in dBm for each transmit power level
const TX_POWER_DBM: [i16; 8] = [-30, -20, -16, -12, -8, -4, 0, 4];

// ----------------------------------------------------------------------------
// Security
// ----------------------------------------------------------------------------

/// Link security required before a peer may access the characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// No pairing required
    Open,
    /// Encrypted link (unauthenticated pairing is enough)
    #[default]
    Encrypted,
    /// Encrypted link with MITM-protected pairing
    Authenticated,
}

// ----------------------------------------------------------------------------
// Transmit Power
// ----------------------------------------------------------------------------

/// Radio transmit power level, 0 (minimal) to 7 (maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TxPower(u8);

impl TxPower {
    pub const MIN: TxPower = TxPower(0);
    pub const MAX: TxPower = TxPower(7);

    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    /// Build a level, saturating out-of-range input at the maximum
    pub fn saturating(level: u8) -> Self {
        Self(level.min(Self::MAX.0))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Output power in dBm
    pub fn dbm(&self) -> i16 {
        TX_POWER_DBM[self.0 as usize]
    }
}

impl Default for TxPower {
    fn default() -> Self {
        Self(6)
    }
}

impl TryFrom<u8> for TxPower {
    type Error = String;

    fn try_from(level: u8) -> core::result::Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("Transmit power level {} out of range 0..=7", level))
    }
}

impl From<TxPower> for u8 {
    fn from(power: TxPower) -> Self {
        power.0
    }
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the byte channel and its host transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity of the inbound and outbound buffers (declared characteristic length)
    pub capacity: usize,
    /// Device name prefix used when advertising
    pub device_name_prefix: String,
    /// Security required on both characteristics
    pub security: SecurityLevel,
    /// Transmit power used for advertising
    pub tx_power: TxPower,
    /// Whether the adapter should advertise the service
    pub advertise: bool,
    /// Service and characteristic UUIDs
    pub layout: ServiceLayout,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PACKET_SIZE,
            device_name_prefix: "remotebit".to_string(),
            security: SecurityLevel::default(),
            tx_power: TxPower::default(),
            advertise: true,
            layout: ServiceLayout::default(),
        }
    }
}

impl ChannelConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set buffer capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set device name prefix
    pub fn with_device_name_prefix(mut self, prefix: String) -> Self {
        self.device_name_prefix = prefix;
        self
    }

    /// Set required security level
    pub fn with_security(mut self, security: SecurityLevel) -> Self {
        self.security = security;
        self
    }

    /// Set transmit power level
    pub fn with_tx_power(mut self, tx_power: TxPower) -> Self {
        self.tx_power = tx_power;
        self
    }

    /// Enable or disable advertising
    pub fn with_advertising(mut self, enabled: bool) -> Self {
        self.advertise = enabled;
        self
    }

    /// Use a custom service layout
    pub fn with_layout(mut self, layout: ServiceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(RemoteBitError::invalid_config("Capacity cannot be zero"));
        }
        if self.capacity > MAX_PACKET_SIZE {
            return Err(RemoteBitError::invalid_config(format!(
                "Capacity {} exceeds the maximum attribute length of {}",
                self.capacity, MAX_PACKET_SIZE
            )));
        }
        if self.device_name_prefix.is_empty() {
            return Err(RemoteBitError::invalid_config("Device name prefix cannot be empty"));
        }

        let layout = &self.layout;
        if layout.inbound_code == layout.outbound_code {
            return Err(RemoteBitError::invalid_config(
                "Inbound and outbound characteristics must use distinct short codes",
            ));
        }

        Ok(())
    }
}
