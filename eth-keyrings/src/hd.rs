//! Mnemonic backed keyring with BIP-44 account discovery

use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use keyring_utils::account::DerivedAccount;
use keyring_utils::address::is_same_address;
use keyring_utils::error::{Error, Result};
use keyring_utils::keyring::Keyring;
use keyring_utils::types::KeyringType;

use crate::derivation::{
    derive_account_key, derive_key_pair, generate_mnemonic, public_key_to_address,
    public_key_to_hex, seed_from_mnemonic, validate_mnemonic, HdPathType,
};
use crate::signing;

/// Upper bound when matching restored addresses back to derivation indexes
pub const MAX_ACCOUNT_INDEX: u32 = 1000;

/// Derived address rows per discovery page
const DEFAULT_PER_PAGE: usize = 5;

/// Vault payload of an HD keyring
///
/// Field names are fixed by the persisted vault format. The passphrase is
/// never part of the payload, only the flag that one is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HdKeyringPayload {
    mnemonic: Option<String>,
    active_indexes: Vec<u32>,
    hd_path: String,
    by_import: bool,
    index: u32,
    need_passphrase: bool,
    public_key: Option<String>,
    accounts: Vec<String>,
}

impl Default for HdKeyringPayload {
    fn default() -> Self {
        Self {
            mnemonic: None,
            active_indexes: Vec::new(),
            hd_path: HdPathType::BIP44.base_path().to_string(),
            by_import: false,
            index: 0,
            need_passphrase: false,
            public_key: None,
            accounts: Vec::new(),
        }
    }
}

/// Account metadata reported for one address of an HD keyring
#[derive(Debug, Clone, PartialEq)]
pub struct HdAccountInfo {
    pub address: String,
    /// Derivation index under the base path, 0-based
    pub index: u32,
    pub hd_path_type: Option<HdPathType>,
    /// Identity key of the keyring that owns the address
    pub base_public_key: Option<String>,
}

/// A keyring deriving accounts from one BIP-39 secret recovery phrase
///
/// Accounts are tracked as the set of activated derivation indexes.
/// `active_indexes` and `accounts` stay parallel: position `i` in one
/// describes position `i` in the other.
pub struct HdKeyring {
    mnemonic: Option<String>,
    passphrase: String,
    need_passphrase: bool,
    hd_path: String,
    active_indexes: Vec<u32>,
    accounts: Vec<String>,
    by_import: bool,
    index: u32,
    public_key: Option<String>,
    seed: Option<Zeroizing<[u8; 64]>>,
    page: usize,
    per_page: usize,
}

impl HdKeyring {
    /// Create an empty keyring with no phrase loaded
    pub fn new() -> Self {
        Self {
            mnemonic: None,
            passphrase: String::new(),
            need_passphrase: false,
            hd_path: HdPathType::BIP44.base_path().to_string(),
            active_indexes: Vec::new(),
            accounts: Vec::new(),
            by_import: false,
            index: 0,
            public_key: None,
            seed: None,
            page: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Create a keyring from an existing phrase
    pub fn from_mnemonic(phrase: &str, passphrase: &str, by_import: bool) -> Result<Self> {
        let mut keyring = Self::new();
        keyring.by_import = by_import;
        keyring.init_from_mnemonic(phrase, passphrase)?;
        Ok(keyring)
    }

    /// Create a keyring around a freshly generated 12 word phrase
    pub fn generate() -> Result<Self> {
        let phrase = generate_mnemonic()?;
        Self::from_mnemonic(&phrase, "", false)
    }

    /// The secret recovery phrase, present once the keyring is initialized
    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    /// Whether this keyring requires a passphrase before it can derive keys
    pub fn need_passphrase(&self) -> bool {
        self.need_passphrase
    }

    /// The base derivation path accounts are discovered under
    pub fn hd_path(&self) -> &str {
        &self.hd_path
    }

    /// Check a candidate passphrase against the keyring identity
    ///
    /// Only meaningful once `public_key` is known, which is the case for
    /// every persisted keyring.
    pub fn check_passphrase(&self, passphrase: &str) -> Result<bool> {
        let phrase = self
            .mnemonic
            .as_deref()
            .ok_or_else(|| Error::Mnemonic("No secret recovery phrase provided".to_string()))?;
        let known = self
            .public_key
            .as_deref()
            .ok_or_else(|| Error::Mnemonic("Keyring identity is not initialized".to_string()))?;

        let seed = seed_from_mnemonic(phrase, passphrase)?;
        let (_, public_key) = derive_key_pair(&seed, &self.hd_path)?;

        Ok(public_key_to_hex(&public_key) == known)
    }

    /// Supply the passphrase of a restored keyring and rebuild its key state
    pub fn set_passphrase(&mut self, passphrase: &str) -> Result<()> {
        self.passphrase.zeroize();
        self.passphrase = passphrase.to_string();
        self.need_passphrase = !passphrase.is_empty();
        self.rebuild_seed()?;
        self.rederive_accounts()
    }

    /// Switch the derivation path layout and re-derive all active accounts
    pub fn set_hd_path(&mut self, path_type: HdPathType) -> Result<()> {
        self.hd_path = path_type.base_path().to_string();
        if self.seed.is_some() {
            let (_, public_key) = derive_key_pair(self.seed_ref()?, &self.hd_path)?;
            self.public_key = Some(public_key_to_hex(&public_key));
            self.rederive_accounts()?;
        }
        Ok(())
    }

    /// Metadata for one owned address
    pub fn get_info_by_address(&self, address: &str) -> Option<HdAccountInfo> {
        let position = self
            .accounts
            .iter()
            .position(|account| is_same_address(account, address))?;

        Some(HdAccountInfo {
            address: self.accounts[position].clone(),
            index: self.active_indexes[position],
            hd_path_type: HdPathType::from_base_path(&self.hd_path),
            base_public_key: self.public_key.clone(),
        })
    }

    fn init_from_mnemonic(&mut self, phrase: &str, passphrase: &str) -> Result<()> {
        if !validate_mnemonic(phrase) {
            return Err(Error::Mnemonic("Invalid secret recovery phrase".to_string()));
        }

        self.mnemonic = Some(phrase.to_string());
        self.passphrase = passphrase.to_string();
        self.need_passphrase = !passphrase.is_empty();
        self.rebuild_seed()
    }

    /// Derive the seed and identity key from the loaded phrase
    fn rebuild_seed(&mut self) -> Result<()> {
        let phrase = self
            .mnemonic
            .as_deref()
            .ok_or_else(|| Error::Mnemonic("No secret recovery phrase provided".to_string()))?;

        let seed = seed_from_mnemonic(phrase, &self.passphrase)?;
        self.seed = Some(Zeroizing::new(seed));

        let (_, public_key) = derive_key_pair(self.seed_ref()?, &self.hd_path)?;
        self.public_key = Some(public_key_to_hex(&public_key));
        Ok(())
    }

    fn seed_ref(&self) -> Result<&[u8]> {
        match &self.seed {
            Some(seed) => Ok(seed.as_ref()),
            None if self.mnemonic.is_some() && self.need_passphrase => Err(Error::Mnemonic(
                "Passphrase required before this keyring can derive keys".to_string(),
            )),
            None => Err(Error::Mnemonic("No secret recovery phrase provided".to_string())),
        }
    }

    fn derive_address(&self, index: u32) -> Result<String> {
        let (_, public_key) = derive_account_key(self.seed_ref()?, &self.hd_path, index)?;
        public_key_to_address(&public_key)
    }

    fn secret_for_address(&self, address: &str) -> Result<SecretKey> {
        let position = self
            .accounts
            .iter()
            .position(|account| is_same_address(account, address))
            .ok_or_else(|| Error::AddressNotFound(address.to_string()))?;

        let index = self.active_indexes[position];
        let (secret_key, _) = derive_account_key(self.seed_ref()?, &self.hd_path, index)?;
        Ok(secret_key)
    }

    /// Refresh the address cache from the active index set
    fn rederive_accounts(&mut self) -> Result<()> {
        let mut accounts = Vec::with_capacity(self.active_indexes.len());
        for &index in &self.active_indexes {
            accounts.push(self.derive_address(index)?);
        }
        self.accounts = accounts;
        Ok(())
    }

    /// Recover derivation indexes for restored addresses that carried none
    ///
    /// Vault entries written by older builds hold only the address list.
    /// Scans indexes in order until every address is matched; an address
    /// outside the scan bound is an error rather than a silently dead
    /// account.
    fn recover_indexes_from_accounts(&mut self, wanted: &[String]) -> Result<()> {
        let mut remaining: Vec<String> = wanted
            .iter()
            .map(|address| address.to_lowercase())
            .collect();
        self.active_indexes.clear();
        self.accounts.clear();

        for index in 0..MAX_ACCOUNT_INDEX {
            if remaining.is_empty() {
                break;
            }
            let address = self.derive_address(index)?;
            let lowered = address.to_lowercase();
            if let Some(position) = remaining.iter().position(|w| *w == lowered) {
                remaining.remove(position);
                self.active_indexes.push(index);
                self.accounts.push(address);
            }
        }

        if let Some(unmatched) = remaining.first() {
            return Err(Error::KeyDerivation(format!(
                "Account {} is not derivable within the first {} indexes",
                unmatched, MAX_ACCOUNT_INDEX
            )));
        }
        Ok(())
    }

    fn page_rows(&self, page: usize) -> Result<Vec<DerivedAccount>> {
        let start = (page - 1) * self.per_page;
        let mut rows = Vec::with_capacity(self.per_page);

        for i in start..start + self.per_page {
            let address = self.derive_address(i as u32)?;
            rows.push(DerivedAccount::new(address, i + 1));
        }
        Ok(rows)
    }
}

impl Default for HdKeyring {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HdKeyring {
    fn drop(&mut self) {
        if let Some(mnemonic) = self.mnemonic.as_mut() {
            mnemonic.zeroize();
        }
        self.passphrase.zeroize();
    }
}

impl Keyring for HdKeyring {
    fn keyring_type(&self) -> KeyringType {
        KeyringType::HdKeyring
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        let payload = HdKeyringPayload {
            mnemonic: self.mnemonic.clone(),
            active_indexes: self.active_indexes.clone(),
            hd_path: self.hd_path.clone(),
            by_import: self.by_import,
            index: self.index,
            need_passphrase: self.need_passphrase,
            public_key: self.public_key.clone(),
            accounts: self.accounts.clone(),
        };

        serde_json::to_value(payload).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize(&mut self, data: serde_json::Value) -> Result<()> {
        let payload: HdKeyringPayload =
            serde_json::from_value(data).map_err(|e| Error::Serialization(e.to_string()))?;

        self.mnemonic = None;
        self.passphrase.zeroize();
        self.passphrase = String::new();
        self.seed = None;
        self.hd_path = payload.hd_path;
        self.by_import = payload.by_import;
        self.index = payload.index;
        self.need_passphrase = payload.need_passphrase;
        self.public_key = payload.public_key;
        self.active_indexes = payload.active_indexes;
        self.accounts = payload.accounts;

        let Some(phrase) = payload.mnemonic else {
            return Ok(());
        };
        self.mnemonic = Some(phrase);

        if self.need_passphrase {
            // Keys stay unavailable until the passphrase is supplied again.
            return Ok(());
        }

        self.rebuild_seed()?;

        if !self.active_indexes.is_empty() {
            self.rederive_accounts()
        } else if !self.accounts.is_empty() {
            let wanted = self.accounts.clone();
            self.recover_indexes_from_accounts(&wanted)
        } else {
            Ok(())
        }
    }

    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        self.seed_ref()?;

        let mut added = Vec::with_capacity(count);
        let mut candidate = 0u32;

        while added.len() < count {
            if self.active_indexes.contains(&candidate) {
                candidate += 1;
                continue;
            }
            let address = self.derive_address(candidate)?;
            self.active_indexes.push(candidate);
            self.accounts.push(address.clone());
            added.push(address);
            candidate += 1;
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
        self.active_indexes.remove(position);
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

    fn get_first_page(&mut self) -> Result<Vec<DerivedAccount>> {
        self.page = 1;
        self.page_rows(self.page)
    }

    fn get_next_page(&mut self) -> Result<Vec<DerivedAccount>> {
        self.page += 1;
        self.page_rows(self.page)
    }

    fn get_addresses(&self, start: u32, end: u32) -> Result<Vec<DerivedAccount>> {
        let mut rows = Vec::new();
        for i in start..end {
            let address = self.derive_address(i)?;
            rows.push(DerivedAccount::new(address, i as usize + 1));
        }
        Ok(rows)
    }

    fn active_accounts(&mut self, indexes: &[u32]) -> Result<Vec<String>> {
        let mut addresses = Vec::with_capacity(indexes.len());

        for &index in indexes {
            let address = self.derive_address(index)?;
            addresses.push(address.clone());

            if !self.active_indexes.contains(&index) {
                self.active_indexes.push(index);
                self.accounts.push(address);
            }
        }
        Ok(addresses)
    }

    fn export_account(&self, address: &str) -> Result<String> {
        let secret_key = self.secret_for_address(address)?;
        Ok(signing::export_private_key(&secret_key))
    }

    fn public_key(&self) -> Option<String> {
        self.public_key.clone()
    }

    fn by_import(&self) -> Option<bool> {
        Some(self.by_import)
    }

    fn hd_index(&self) -> Option<u32> {
        Some(self.index)
    }

    fn set_hd_index(&mut self, index: u32) -> Result<()> {
        self.index = index;
        Ok(())
    }
}
