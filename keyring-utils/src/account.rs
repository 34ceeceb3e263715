//! Account and serialization models shared across keyring backends

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::KeyringType;

/// An account as exposed to consumers of the keyring layer
///
/// Accounts are immutable once created. User-facing alias names live in the
/// contact book outside the keyring layer, keyed by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringAccount {
    /// Hex address
    pub address: String,
    /// Connection brand, defaults to the keyring type wire string
    pub brand_name: String,
    /// Type of the keyring that owns this account
    #[serde(rename = "type")]
    pub kind: KeyringType,
    /// Underlying wallet brand for aggregated connectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_brand_name: Option<String>,
    /// Icon URL reported by the underlying wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_brand_url: Option<String>,
}

impl KeyringAccount {
    /// Create an account with the default brand for its keyring type
    pub fn new(kind: KeyringType, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            brand_name: kind.as_str().to_string(),
            kind,
            real_brand_name: None,
            real_brand_url: None,
        }
    }

    /// Create an account carrying an explicit brand
    pub fn with_brand(kind: KeyringType, address: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            brand_name: brand.into(),
            kind,
            real_brand_name: None,
            real_brand_url: None,
        }
    }
}

/// An account row inside a displayed keyring group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedAccount {
    pub address: String,
    pub brand_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_name: Option<String>,
}

/// One serialized keyring as stored in the vault
///
/// `kind` stays a raw string so vault payloads written by builds with more
/// backend types survive a round trip through merge and persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyringSerializedData {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl KeyringSerializedData {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data }
    }

    /// Parse the type string against the registry
    pub fn keyring_type(&self) -> Result<KeyringType> {
        self.kind.parse()
    }
}

/// A derived address row produced by keyring paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedAccount {
    pub address: String,
    /// Derivation position, 1-based as displayed to users
    pub index: usize,
    /// Filled in by balance lookups outside the keyring layer
    pub balance: Option<f64>,
}

impl DerivedAccount {
    pub fn new(address: impl Into<String>, index: usize) -> Self {
        Self {
            address: address.into(),
            index,
            balance: None,
        }
    }
}
