//! BLE protocol constants and utilities for remote:bit

use remotebit_core::SecurityLevel;

// ----------------------------------------------------------------------------
// Protocol Utilities
// ----------------------------------------------------------------------------

/// Generate the advertised device name
///
/// The suffix (typically the tail of the adapter address) is appended in hex so several
/// devices with the same prefix can be told apart. An empty suffix yields the bare prefix.
pub fn generate_device_name(prefix: &str, suffix: &[u8]) -> String {
    if suffix.is_empty() {
        prefix.to_string()
    } else {
        format!("{}-{}", prefix, hex::encode(suffix))
    }
}

/// Whether writes to the inbound characteristic require an encrypted link
pub fn requires_encryption(security: SecurityLevel) -> bool {
    !matches!(security, SecurityLevel::Open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_generation() {
        assert_eq!(generate_device_name("remotebit", &[0xAB, 0x0C]), "remotebit-ab0c");
        assert_eq!(generate_device_name("remotebit", &[]), "remotebit");
    }

    #[test]
    fn test_security_levels() {
        assert!(!requires_encryption(SecurityLevel::Open));
        assert!(requires_encryption(SecurityLevel::Encrypted));
        assert!(requires_encryption(SecurityLevel::Authenticated));
    }
}
