//! Watch-only keyring for addresses with no local key material

use serde::{Deserialize, Serialize};

use keyring_utils::account::KeyringAccount;
use keyring_utils::address::{is_same_address, is_valid_address, to_checksum_address};
use keyring_utils::error::{Error, Result};
use keyring_utils::keyring::Keyring;
use keyring_utils::types::KeyringType;

/// Vault payload of a watch keyring
///
/// Older payloads carry only the address list; brands backfill with the
/// wire type string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WatchKeyringPayload {
    accounts: Vec<String>,
    #[serde(default)]
    brands: Vec<String>,
}

/// A keyring tracking external addresses for display and lookup only
///
/// Imports go through a two step flow: an address (and optional brand) is
/// staged with [`Keyring::set_account_to_add`], then committed by
/// [`Keyring::add_accounts`]. Signing always fails.
#[derive(Default)]
pub struct WatchKeyring {
    accounts: Vec<String>,
    brands: Vec<String>,
    staged: Option<(String, Option<String>)>,
}

impl WatchKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    fn default_brand() -> String {
        KeyringType::WatchAddressKeyring.as_str().to_string()
    }
}

impl Keyring for WatchKeyring {
    fn keyring_type(&self) -> KeyringType {
        KeyringType::WatchAddressKeyring
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        let payload = WatchKeyringPayload {
            accounts: self.accounts.clone(),
            brands: self.brands.clone(),
        };
        serde_json::to_value(payload).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize(&mut self, data: serde_json::Value) -> Result<()> {
        let payload: WatchKeyringPayload =
            serde_json::from_value(data).map_err(|e| Error::Serialization(e.to_string()))?;

        self.brands = (0..payload.accounts.len())
            .map(|i| payload.brands.get(i).cloned().unwrap_or_else(Self::default_brand))
            .collect();
        self.accounts = payload.accounts;
        self.staged = None;
        Ok(())
    }

    fn add_accounts(&mut self, _count: usize) -> Result<Vec<String>> {
        let (address, brand) = self
            .staged
            .take()
            .ok_or_else(|| Error::InvalidInput("No address staged for import".to_string()))?;

        if !is_valid_address(&address) {
            return Err(Error::InvalidAddress(address));
        }
        if self.accounts.iter().any(|account| is_same_address(account, &address)) {
            return Err(Error::InvalidInput(
                "The address you are trying to import is duplicated".to_string(),
            ));
        }

        let address = to_checksum_address(&address)?;
        self.accounts.push(address.clone());
        self.brands.push(brand.unwrap_or_else(Self::default_brand));
        Ok(vec![address])
    }

    fn get_accounts(&self) -> Vec<String> {
        self.accounts.clone()
    }

    fn remove_account(&mut self, address: &str, _brand: Option<&str>) -> Result<()> {
        let position = self
            .accounts
            .iter()
            .position(|account| is_same_address(account, address))
            .ok_or_else(|| Error::AddressNotFound(address.to_string()))?;

        self.accounts.remove(position);
        self.brands.remove(position);
        Ok(())
    }

    fn sign_transaction(
        &self,
        _address: &str,
        _tx: &ethers_core::types::transaction::eip2718::TypedTransaction,
    ) -> Result<ethers_core::types::Signature> {
        Err(Error::unsupported(self.keyring_type().as_str(), "signTransaction"))
    }

    fn sign_personal_message(
        &self,
        _address: &str,
        _message: &[u8],
    ) -> Result<ethers_core::types::Signature> {
        Err(Error::unsupported(self.keyring_type().as_str(), "signPersonalMessage"))
    }

    fn sign_typed_data(
        &self,
        _address: &str,
        _typed_data: &ethers_core::types::transaction::eip712::TypedData,
    ) -> Result<ethers_core::types::Signature> {
        Err(Error::unsupported(self.keyring_type().as_str(), "signTypedData"))
    }

    fn accounts_with_brand(&self) -> Option<Vec<KeyringAccount>> {
        let rows = self
            .accounts
            .iter()
            .zip(&self.brands)
            .map(|(address, brand)| {
                KeyringAccount::with_brand(KeyringType::WatchAddressKeyring, address, brand)
            })
            .collect();
        Some(rows)
    }

    fn set_account_to_add(&mut self, address: &str, brand: Option<String>) -> Result<()> {
        self.staged = Some((address.to_string(), brand));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_stage_and_commit() {
        let mut keyring = WatchKeyring::new();
        keyring.set_account_to_add(&TEST_ADDRESS.to_lowercase(), None).unwrap();

        let added = keyring.add_accounts(1).unwrap();
        assert_eq!(added, vec![TEST_ADDRESS]);

        let rows = keyring.accounts_with_brand().unwrap();
        assert_eq!(rows[0].brand_name, "Watch Address");
    }

    #[test]
    fn test_commit_without_staging() {
        let mut keyring = WatchKeyring::new();
        assert!(keyring.add_accounts(1).is_err());
    }

    #[test]
    fn test_staged_brand_is_kept() {
        let mut keyring = WatchKeyring::new();
        keyring
            .set_account_to_add(TEST_ADDRESS, Some("MetaMask".to_string()))
            .unwrap();
        keyring.add_accounts(1).unwrap();

        let rows = keyring.accounts_with_brand().unwrap();
        assert_eq!(rows[0].brand_name, "MetaMask");
        assert_eq!(rows[0].kind, KeyringType::WatchAddressKeyring);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut keyring = WatchKeyring::new();
        keyring.set_account_to_add("0x1234", None).unwrap();
        assert!(matches!(keyring.add_accounts(1), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_duplicate_rejected_case_insensitive() {
        let mut keyring = WatchKeyring::new();
        keyring.set_account_to_add(TEST_ADDRESS, None).unwrap();
        keyring.add_accounts(1).unwrap();

        keyring.set_account_to_add(&TEST_ADDRESS.to_uppercase().replace("0X", "0x"), None).unwrap();
        assert!(keyring.add_accounts(1).is_err());
    }

    #[test]
    fn test_signing_is_unsupported() {
        let keyring = WatchKeyring::new();
        let result = keyring.sign_personal_message(TEST_ADDRESS, b"hi");
        assert!(matches!(result, Err(Error::Unsupported { .. })));
    }

    #[test]
    fn test_deserialize_backfills_brands() {
        let mut keyring = WatchKeyring::new();
        keyring
            .deserialize(serde_json::json!({ "accounts": [TEST_ADDRESS] }))
            .unwrap();

        let rows = keyring.accounts_with_brand().unwrap();
        assert_eq!(rows[0].brand_name, "Watch Address");

        let payload = keyring.serialize().unwrap();
        assert_eq!(payload["brands"], serde_json::json!(["Watch Address"]));
    }

    #[test]
    fn test_remove_account() {
        let mut keyring = WatchKeyring::new();
        keyring.set_account_to_add(TEST_ADDRESS, None).unwrap();
        keyring.add_accounts(1).unwrap();

        keyring.remove_account(&TEST_ADDRESS.to_lowercase(), None).unwrap();
        assert!(keyring.get_accounts().is_empty());
        assert!(keyring.accounts_with_brand().unwrap().is_empty());
    }
}
