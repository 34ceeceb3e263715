//! Keyring type registry
//!
//! Every keyring backend is identified by one of the types below. The wire
//! string of each variant is stable: it is the lookup key for serialized
//! vault entries, so renaming one would orphan existing accounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported key management backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyringType {
    /// BIP-39 mnemonic with BIP-32 derived accounts
    #[serde(rename = "HD Key Tree")]
    HdKeyring,
    /// Imported raw private keys
    #[serde(rename = "Simple Key Pair")]
    SimpleKeyring,
    /// Watch-only addresses without key material
    #[serde(rename = "Watch Address")]
    WatchAddressKeyring,
    /// Accounts signing through WalletConnect sessions
    #[serde(rename = "WalletConnect")]
    WalletConnectKeyring,
    /// Ledger hardware devices
    #[serde(rename = "Ledger Hardware")]
    LedgerKeyring,
    /// Trezor hardware devices
    #[serde(rename = "Trezor Hardware")]
    TrezorKeyring,
    /// Keystone and other QR-code air-gapped devices
    #[serde(rename = "QR Hardware Wallet Device")]
    KeystoneKeyring,
    /// OneKey hardware devices
    #[serde(rename = "Onekey Hardware")]
    OneKeyKeyring,
    /// Safe (Gnosis) multisig contract accounts
    #[serde(rename = "Gnosis")]
    GnosisKeyring,
}

/// Display grouping for keyring types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyringCategory {
    Mnemonic,
    PrivateKey,
    WatchAddress,
    WalletConnect,
    Hardware,
    Contract,
}

impl KeyringType {
    /// All registered keyring types
    pub const ALL: [KeyringType; 9] = [
        KeyringType::HdKeyring,
        KeyringType::SimpleKeyring,
        KeyringType::WatchAddressKeyring,
        KeyringType::WalletConnectKeyring,
        KeyringType::LedgerKeyring,
        KeyringType::TrezorKeyring,
        KeyringType::KeystoneKeyring,
        KeyringType::OneKeyKeyring,
        KeyringType::GnosisKeyring,
    ];

    /// Get the stable wire string for this keyring type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HdKeyring => "HD Key Tree",
            Self::SimpleKeyring => "Simple Key Pair",
            Self::WatchAddressKeyring => "Watch Address",
            Self::WalletConnectKeyring => "WalletConnect",
            Self::LedgerKeyring => "Ledger Hardware",
            Self::TrezorKeyring => "Trezor Hardware",
            Self::KeystoneKeyring => "QR Hardware Wallet Device",
            Self::OneKeyKeyring => "Onekey Hardware",
            Self::GnosisKeyring => "Gnosis",
        }
    }

    /// Get the display category for this keyring type
    pub fn category(&self) -> KeyringCategory {
        match self {
            Self::HdKeyring => KeyringCategory::Mnemonic,
            Self::SimpleKeyring => KeyringCategory::PrivateKey,
            Self::WatchAddressKeyring => KeyringCategory::WatchAddress,
            Self::WalletConnectKeyring => KeyringCategory::WalletConnect,
            Self::LedgerKeyring | Self::TrezorKeyring | Self::KeystoneKeyring | Self::OneKeyKeyring => {
                KeyringCategory::Hardware
            }
            Self::GnosisKeyring => KeyringCategory::Contract,
        }
    }

    /// Check whether accounts of this type can produce signatures
    pub fn supports_signing(&self) -> bool {
        !matches!(self, Self::WatchAddressKeyring)
    }

    /// Check whether the serialized payload of this type contains secrets
    ///
    /// Secret-holding payloads must only ever be persisted inside the
    /// encrypted vault, never in the plain keyring mirror.
    pub fn holds_secrets(&self) -> bool {
        matches!(self, Self::HdKeyring | Self::SimpleKeyring)
    }
}

impl fmt::Display for KeyringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyringType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownKeyringType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_string_round_trip() {
        for keyring_type in KeyringType::ALL {
            let parsed = KeyringType::from_str(keyring_type.as_str()).unwrap();
            assert_eq!(parsed, keyring_type);
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = KeyringType::from_str("Paper Wallet").unwrap_err();
        assert!(matches!(err, Error::UnknownKeyringType(_)));
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&KeyringType::KeystoneKeyring).unwrap();
        assert_eq!(json, "\"QR Hardware Wallet Device\"");

        let parsed: KeyringType = serde_json::from_str("\"HD Key Tree\"").unwrap();
        assert_eq!(parsed, KeyringType::HdKeyring);
    }

    #[test]
    fn test_categories() {
        assert_eq!(KeyringType::HdKeyring.category(), KeyringCategory::Mnemonic);
        assert_eq!(KeyringType::LedgerKeyring.category(), KeyringCategory::Hardware);
        assert_eq!(KeyringType::TrezorKeyring.category(), KeyringCategory::Hardware);
        assert_eq!(KeyringType::GnosisKeyring.category(), KeyringCategory::Contract);
    }

    #[test]
    fn test_watch_addresses_cannot_sign() {
        assert!(!KeyringType::WatchAddressKeyring.supports_signing());
        assert!(KeyringType::HdKeyring.supports_signing());
    }

    #[test]
    fn test_secret_payload_types() {
        assert!(KeyringType::HdKeyring.holds_secrets());
        assert!(KeyringType::SimpleKeyring.holds_secrets());
        assert!(!KeyringType::LedgerKeyring.holds_secrets());
        assert!(!KeyringType::WatchAddressKeyring.holds_secrets());
    }
}
