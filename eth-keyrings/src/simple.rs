//! Keyring over individually imported raw private keys

use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use keyring_utils::address::is_same_address;
use keyring_utils::error::{Error, Result};
use keyring_utils::keyring::Keyring;
use keyring_utils::types::KeyringType;

use crate::derivation::public_key_to_address;
use crate::signing;

/// A keyring holding loose secp256k1 keys with no derivation structure
///
/// `keys` and `accounts` stay parallel, position `i` in one describes
/// position `i` in the other.
#[derive(Default)]
pub struct SimpleKeyring {
    keys: Vec<Zeroizing<[u8; 32]>>,
    accounts: Vec<String>,
}

impl SimpleKeyring {
    /// Create an empty keyring
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a keyring from hex encoded private keys
    pub fn from_private_keys(keys: &[&str]) -> Result<Self> {
        let mut keyring = Self::new();
        for key in keys {
            keyring.import_key(key)?;
        }
        Ok(keyring)
    }

    /// Import one hex encoded private key, returning its address
    pub fn import_key(&mut self, key: &str) -> Result<String> {
        let (bytes, secret_key) = parse_private_key(key)?;
        let address = address_for_key(&secret_key)?;

        self.keys.push(bytes);
        self.accounts.push(address.clone());
        Ok(address)
    }

    fn secret_for_address(&self, address: &str) -> Result<SecretKey> {
        let position = self
            .accounts
            .iter()
            .position(|account| is_same_address(account, address))
            .ok_or_else(|| Error::AddressNotFound(address.to_string()))?;

        SecretKey::from_slice(self.keys[position].as_ref())
            .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))
    }
}

/// Decode and validate a hex private key, with or without a 0x prefix
fn parse_private_key(key: &str) -> Result<(Zeroizing<[u8; 32]>, SecretKey)> {
    let stripped = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")).unwrap_or(key);

    let decoded = hex::decode(stripped)
        .map_err(|e| Error::InvalidInput(format!("Invalid private key hex: {}", e)))?;
    if decoded.len() != 32 {
        return Err(Error::InvalidInput(format!(
            "Private key must be 32 bytes, got {}",
            decoded.len()
        )));
    }

    let mut bytes = Zeroizing::new([0u8; 32]);
    bytes.copy_from_slice(&decoded);

    let secret_key = SecretKey::from_slice(bytes.as_ref())
        .map_err(|e| Error::InvalidInput(format!("Invalid private key: {}", e)))?;

    Ok((bytes, secret_key))
}

fn address_for_key(secret_key: &SecretKey) -> Result<String> {
    let public_key = PublicKey::from_secret_key(&Secp256k1::new(), secret_key);
    public_key_to_address(&public_key)
}

impl Keyring for SimpleKeyring {
    fn keyring_type(&self) -> KeyringType {
        KeyringType::SimpleKeyring
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        let keys: Vec<String> = self.keys.iter().map(|key| hex::encode(key.as_ref())).collect();
        serde_json::to_value(keys).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize(&mut self, data: serde_json::Value) -> Result<()> {
        let keys: Vec<String> =
            serde_json::from_value(data).map_err(|e| Error::Serialization(e.to_string()))?;

        self.keys.clear();
        self.accounts.clear();
        for key in &keys {
            self.import_key(key)?;
        }
        Ok(())
    }

    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        let mut added = Vec::with_capacity(count);
        for _ in 0..count {
            let secret_key = SecretKey::new(&mut OsRng);
            let address = address_for_key(&secret_key)?;

            self.keys.push(Zeroizing::new(secret_key.secret_bytes()));
            self.accounts.push(address.clone());
            added.push(address);
        }
        Ok(added)
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
        self.keys.remove(position);
        Ok(())
    }

    fn sign_transaction(
        &self,
        address: &str,
        tx: &ethers_core::types::transaction::eip2718::TypedTransaction,
    ) -> Result<ethers_core::types::Signature> {
        let secret_key = self.secret_for_address(address)?;
        signing::sign_transaction(&secret_key, tx)
    }

    fn sign_personal_message(
        &self,
        address: &str,
        message: &[u8],
    ) -> Result<ethers_core::types::Signature> {
        let secret_key = self.secret_for_address(address)?;
        signing::sign_personal_message(&secret_key, message)
    }

    fn sign_typed_data(
        &self,
        address: &str,
        typed_data: &ethers_core::types::transaction::eip712::TypedData,
    ) -> Result<ethers_core::types::Signature> {
        let secret_key = self.secret_for_address(address)?;
        signing::sign_typed_data(&secret_key, typed_data)
    }

    fn export_account(&self, address: &str) -> Result<String> {
        let secret_key = self.secret_for_address(address)?;
        Ok(signing::export_private_key(&secret_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::utils::hash_message;
    use std::str::FromStr;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_import_known_key() {
        let keyring = SimpleKeyring::from_private_keys(&[TEST_KEY]).unwrap();
        assert_eq!(keyring.get_accounts(), vec![TEST_ADDRESS]);
    }

    #[test]
    fn test_import_accepts_prefixed_hex() {
        let prefixed = format!("0x{}", TEST_KEY);
        let keyring = SimpleKeyring::from_private_keys(&[&prefixed]).unwrap();
        assert_eq!(keyring.get_accounts(), vec![TEST_ADDRESS]);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(SimpleKeyring::from_private_keys(&["zz"]).is_err());
        assert!(SimpleKeyring::from_private_keys(&["abcd"]).is_err());
        // zero is not a valid scalar
        let zero = "0".repeat(64);
        assert!(SimpleKeyring::from_private_keys(&[&zero]).is_err());
    }

    #[test]
    fn test_add_accounts_generates_fresh_keys() {
        let mut keyring = SimpleKeyring::new();
        let added = keyring.add_accounts(2).unwrap();

        assert_eq!(added.len(), 2);
        assert_ne!(added[0], added[1]);
        assert_eq!(keyring.get_accounts(), added);
    }

    #[test]
    fn test_serialize_is_bare_hex_list() {
        let keyring = SimpleKeyring::from_private_keys(&[TEST_KEY]).unwrap();
        let payload = keyring.serialize().unwrap();
        assert_eq!(payload, serde_json::json!([TEST_KEY]));

        let mut restored = SimpleKeyring::new();
        restored.deserialize(payload).unwrap();
        assert_eq!(restored.get_accounts(), keyring.get_accounts());
    }

    #[test]
    fn test_remove_account() {
        let mut keyring = SimpleKeyring::from_private_keys(&[TEST_KEY]).unwrap();
        keyring.remove_account(&TEST_ADDRESS.to_lowercase(), None).unwrap();
        assert!(keyring.get_accounts().is_empty());

        let result = keyring.remove_account(TEST_ADDRESS, None);
        assert!(matches!(result, Err(Error::AddressNotFound(_))));
    }

    #[test]
    fn test_sign_personal_message() {
        let keyring = SimpleKeyring::from_private_keys(&[TEST_KEY]).unwrap();
        let signature = keyring.sign_personal_message(TEST_ADDRESS, b"hello").unwrap();

        let recovered = signature.recover(hash_message(b"hello")).unwrap();
        assert_eq!(
            recovered,
            ethers_core::types::Address::from_str(TEST_ADDRESS).unwrap()
        );
    }

    #[test]
    fn test_export_account() {
        let keyring = SimpleKeyring::from_private_keys(&[TEST_KEY]).unwrap();
        assert_eq!(keyring.export_account(TEST_ADDRESS).unwrap(), TEST_KEY);
    }
}
