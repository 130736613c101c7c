//! Service and characteristic addressing
//!
//! remote:bit names its GATT service and characteristics by combining a 128-bit base UUID
//! with a 16-bit short code stored in octets 2 and 3 (big-endian), the same way the
//! Bluetooth SIG base UUID carries 16-bit assigned numbers. Nothing here carries behavior;
//! adapters only use it to register attributes and to recognize which characteristic a
//! peer wrote.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Reference Identifiers
// ----------------------------------------------------------------------------

/// Base UUID of the remote:bit service
pub const SERVICE_BASE: UuidBase = UuidBase(Uuid::from_u128(0xec210000_2069_30da_a26e_1273cb048349));

/// Base UUID shared by the remote:bit characteristics
pub const CHARACTERISTIC_BASE: UuidBase =
    UuidBase(Uuid::from_u128(0xec210000_2069_30da_a26e_1273cb04834a));

/// Short code of the remote:bit service
pub const SERVICE_CODE: u16 = 0xa0c0;

/// Short code of the characteristic the peer writes to
pub const INBOUND_CODE: u16 = 0xbcc1;

/// Short code of the characteristic notified towards the peer
pub const OUTBOUND_CODE: u16 = 0xbcc2;

// ----------------------------------------------------------------------------
// UUID Base
// ----------------------------------------------------------------------------

/// A 128-bit base UUID that yields full UUIDs from 16-bit short codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UuidBase(Uuid);

impl UuidBase {
    pub const fn new(base: Uuid) -> Self {
        Self(base)
    }

    /// The base UUID itself
    pub const fn uuid(&self) -> Uuid {
        self.0
    }

    /// Combine the base with a short code
    pub fn with_short(&self, code: u16) -> Uuid {
        let mut bytes = *self.0.as_bytes();
        bytes[2..4].copy_from_slice(&code.to_be_bytes());
        Uuid::from_bytes(bytes)
    }

    /// Recover the short code if `uuid` was derived from this base
    pub fn short_of(&self, uuid: &Uuid) -> Option<u16> {
        let base = self.0.as_bytes();
        let candidate = uuid.as_bytes();

        let prefix_matches = base[..2] == candidate[..2];
        let suffix_matches = base[4..] == candidate[4..];
        if prefix_matches && suffix_matches {
            Some(u16::from_be_bytes([candidate[2], candidate[3]]))
        } else {
            None
        }
    }
}

impl fmt::Display for UuidBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ----------------------------------------------------------------------------
// Characteristics
// ----------------------------------------------------------------------------

/// The two characteristics of the byte channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicId {
    /// Written by the peer (write-only)
    Inbound,
    /// Notified to the peer (notify-only)
    Outbound,
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicId::Inbound => write!(f, "rx"),
            CharacteristicId::Outbound => write!(f, "tx"),
        }
    }
}

// ----------------------------------------------------------------------------
// Service Layout
// ----------------------------------------------------------------------------

/// UUIDs of the service and its characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLayout {
    pub service_base: UuidBase,
    pub characteristic_base: UuidBase,
    pub service_code: u16,
    pub inbound_code: u16,
    pub outbound_code: u16,
}

impl Default for ServiceLayout {
    fn default() -> Self {
        Self {
            service_base: SERVICE_BASE,
            characteristic_base: CHARACTERISTIC_BASE,
            service_code: SERVICE_CODE,
            inbound_code: INBOUND_CODE,
            outbound_code: OUTBOUND_CODE,
        }
    }
}

impl ServiceLayout {
    pub fn service_uuid(&self) -> Uuid {
        self.service_base.with_short(self.service_code)
    }

    pub fn characteristic_uuid(&self, characteristic: CharacteristicId) -> Uuid {
        match characteristic {
            CharacteristicId::Inbound => self.characteristic_base.with_short(self.inbound_code),
            CharacteristicId::Outbound => self.characteristic_base.with_short(self.outbound_code),
        }
    }

    /// Map a characteristic UUID reported by a host stack back to its role
    pub fn identify(&self, uuid: &Uuid) -> Option<CharacteristicId> {
        match self.characteristic_base.short_of(uuid)? {
            code if code == self.inbound_code => Some(CharacteristicId::Inbound),
            code if code == self.outbound_code => Some(CharacteristicId::Outbound),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_uuids_match_published_values() {
        let layout = ServiceLayout::default();

        assert_eq!(
            layout.service_uuid().to_string(),
            "ec21a0c0-2069-30da-a26e-1273cb048349"
        );
        assert_eq!(
            layout.characteristic_uuid(CharacteristicId::Inbound).to_string(),
            "ec21bcc1-2069-30da-a26e-1273cb04834a"
        );
        assert_eq!(
            layout.characteristic_uuid(CharacteristicId::Outbound).to_string(),
            "ec21bcc2-2069-30da-a26e-1273cb04834a"
        );
    }

    #[test]
    fn identify_recognizes_only_own_characteristics() {
        let layout = ServiceLayout::default();

        let rx = layout.characteristic_uuid(CharacteristicId::Inbound);
        let tx = layout.characteristic_uuid(CharacteristicId::Outbound);
        assert_eq!(layout.identify(&rx), Some(CharacteristicId::Inbound));
        assert_eq!(layout.identify(&tx), Some(CharacteristicId::Outbound));

        // The service UUID lives under a different base
        assert_eq!(layout.identify(&layout.service_uuid()), None);
        assert_eq!(layout.identify(&CHARACTERISTIC_BASE.with_short(0x1234)), None);
    }

    #[test]
    fn short_code_round_trips_through_base() {
        let uuid = SERVICE_BASE.with_short(0xbeef);
        assert_eq!(SERVICE_BASE.short_of(&uuid), Some(0xbeef));
        assert_eq!(CHARACTERISTIC_BASE.short_of(&uuid), None);
    }
}
