//! Read-side projections of keyrings for display layers

use std::fmt;
use std::sync::Arc;

use crate::account::{DerivedAccount, DisplayedAccount, KeyringAccount};
use crate::error::Result;
use crate::keyring::KeyringHandle;
use crate::types::KeyringType;

/// A reduced read-side view over a shared keyring
///
/// Wrapping hands out account queries and derivation paging without exposing
/// signing or serialization. The view holds the same handle as the service,
/// so re-wrapping an existing view still observes the same keyring.
#[derive(Clone)]
pub struct DisplayKeyring {
    kind: KeyringType,
    inner: KeyringHandle,
}

impl DisplayKeyring {
    /// Wrap a shared keyring handle
    pub fn new(handle: KeyringHandle) -> Self {
        let kind = handle.lock().unwrap().keyring_type();
        Self { kind, inner: handle }
    }

    /// The registry type of the wrapped keyring
    pub fn keyring_type(&self) -> KeyringType {
        self.kind
    }

    /// All addresses managed by the wrapped keyring
    pub fn get_accounts(&self) -> Vec<String> {
        self.inner.lock().unwrap().get_accounts()
    }

    /// Account rows with per-address brands, when the backend tracks them
    pub fn accounts_with_brand(&self) -> Option<Vec<KeyringAccount>> {
        self.inner.lock().unwrap().accounts_with_brand()
    }

    /// Promote derivation indexes to accounts
    pub fn active_accounts(&self, indexes: &[u32]) -> Result<Vec<String>> {
        self.inner.lock().unwrap().active_accounts(indexes)
    }

    /// First page of derivable addresses
    pub fn get_first_page(&self) -> Result<Vec<DerivedAccount>> {
        self.inner.lock().unwrap().get_first_page()
    }

    /// Next page of derivable addresses
    pub fn get_next_page(&self) -> Result<Vec<DerivedAccount>> {
        self.inner.lock().unwrap().get_next_page()
    }

    /// Open the backend session, for backends that have one
    pub fn unlock(&self) -> Result<()> {
        self.inner.lock().unwrap().unlock()
    }

    /// Check whether two views observe the same underlying keyring
    pub fn shares_keyring(&self, other: &DisplayKeyring) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<&DisplayKeyring> for DisplayKeyring {
    /// Re-wrapping a view yields a view over the same keyring
    fn from(view: &DisplayKeyring) -> Self {
        view.clone()
    }
}

impl fmt::Debug for DisplayKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayKeyring")
            .field("type", &self.kind.as_str())
            .finish()
    }
}

/// One keyring group as handed to display layers
#[derive(Debug, Clone)]
pub struct DisplayedKeyring {
    /// The registry type of the group
    pub kind: KeyringType,
    /// Account rows, brand-aware where the backend supports it
    pub accounts: Vec<DisplayedAccount>,
    /// Read-side view over the originating keyring
    pub keyring: DisplayKeyring,
    /// Whether the keyring was imported
    pub by_import: Option<bool>,
    /// Identity key of mnemonic keyrings
    pub public_key: Option<String>,
}
