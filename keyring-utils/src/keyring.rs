//! The structural contract every keyring backend satisfies
//!
//! A keyring owns the key material (or address book) for one group of
//! accounts and knows how to serialize itself into an opaque vault payload.
//! The orchestrating service only ever talks to `dyn Keyring`.

use std::fmt;
use std::sync::{Arc, Mutex};

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::transaction::eip712::TypedData;
use ethers_core::types::Signature;

use crate::account::{DerivedAccount, KeyringAccount};
use crate::error::{Error, Result};
use crate::types::KeyringType;

/// A keyring backend
///
/// The required surface covers serialization, account management and
/// signing. The optional surface has defaults that fail with
/// [`Error::Unsupported`], so backends only implement what they can do:
/// hardware backends add paging and unlock, mnemonic backends add index
/// activation, aggregated connectors add per-account brands.
pub trait Keyring: Send {
    /// The registry type of this backend
    fn keyring_type(&self) -> KeyringType;

    /// Serialize the backend state into its vault payload
    fn serialize(&self) -> Result<serde_json::Value>;

    /// Restore the backend state from a vault payload
    fn deserialize(&mut self, data: serde_json::Value) -> Result<()>;

    /// Add `count` new accounts and return their addresses
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>>;

    /// All addresses currently managed by this keyring
    fn get_accounts(&self) -> Vec<String>;

    /// Remove one account, with an optional brand for multi-brand backends
    fn remove_account(&mut self, address: &str, brand: Option<&str>) -> Result<()>;

    /// Sign an Ethereum transaction with the key behind `address`
    fn sign_transaction(&self, address: &str, tx: &TypedTransaction) -> Result<Signature>;

    /// Sign a personal message (EIP-191 prefixed hash)
    fn sign_personal_message(&self, address: &str, message: &[u8]) -> Result<Signature>;

    /// Sign an EIP-712 typed data payload
    fn sign_typed_data(&self, address: &str, typed_data: &TypedData) -> Result<Signature>;

    /// Prepare the backend for use, for backends with a session to open
    fn unlock(&mut self) -> Result<()> {
        Err(Error::unsupported(self.keyring_type().as_str(), "unlock"))
    }

    /// Reset paging and return the first page of derivable addresses
    fn get_first_page(&mut self) -> Result<Vec<DerivedAccount>> {
        Err(Error::unsupported(self.keyring_type().as_str(), "getFirstPage"))
    }

    /// Return the next page of derivable addresses
    fn get_next_page(&mut self) -> Result<Vec<DerivedAccount>> {
        Err(Error::unsupported(self.keyring_type().as_str(), "getNextPage"))
    }

    /// Derive address rows in `[start, end)` without activating them
    fn get_addresses(&self, _start: u32, _end: u32) -> Result<Vec<DerivedAccount>> {
        Err(Error::unsupported(self.keyring_type().as_str(), "getAddresses"))
    }

    /// Promote an explicit set of derivation indexes to accounts
    fn active_accounts(&mut self, _indexes: &[u32]) -> Result<Vec<String>> {
        Err(Error::unsupported(self.keyring_type().as_str(), "activeAccounts"))
    }

    /// Account rows with per-address brands, for multi-brand backends
    fn accounts_with_brand(&self) -> Option<Vec<KeyringAccount>> {
        None
    }

    /// Stage an address for the next `add_accounts` call
    fn set_account_to_add(&mut self, _address: &str, _brand: Option<String>) -> Result<()> {
        Err(Error::unsupported(self.keyring_type().as_str(), "setAccountToAdd"))
    }

    /// Export the private key behind `address`
    fn export_account(&self, _address: &str) -> Result<String> {
        Err(Error::unsupported(self.keyring_type().as_str(), "exportAccount"))
    }

    /// Stable identity key of the backend, for mnemonic backends
    fn public_key(&self) -> Option<String> {
        None
    }

    /// Whether the backend was imported rather than created in place
    fn by_import(&self) -> Option<bool> {
        None
    }

    /// Ordinal of a mnemonic backend among its siblings, feeds alias names
    fn hd_index(&self) -> Option<u32> {
        None
    }

    /// Assign the sibling ordinal of a mnemonic backend
    fn set_hd_index(&mut self, _index: u32) -> Result<()> {
        Err(Error::unsupported(self.keyring_type().as_str(), "setHdIndex"))
    }

    /// Drop any device pairing held by the backend
    ///
    /// Called before an emptied keyring is discarded. Backends without a
    /// device session have nothing to forget.
    fn forget_device(&mut self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("type", &self.keyring_type().as_str())
            .finish()
    }
}

/// A shared, lockable keyring
///
/// The service and every display view hold clones of the same handle, so
/// mutations through one view are observed by all others.
pub type KeyringHandle = Arc<Mutex<Box<dyn Keyring>>>;

/// Wrap a boxed keyring into a shared handle
pub fn into_handle(keyring: Box<dyn Keyring>) -> KeyringHandle {
    Arc::new(Mutex::new(keyring))
}
