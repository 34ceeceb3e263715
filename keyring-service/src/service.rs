//! Orchestration of keyring backends behind one session password
//!
//! The service owns the list of live keyrings, the encrypted vault they
//! persist into, and the unlocked/locked session state. Hosts subscribe to
//! [`KeyringEvent`] for account and lifecycle changes.

use std::sync::{Arc, Mutex};

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::transaction::eip712::TypedData;
use ethers_core::types::Signature;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use zeroize::Zeroize;

use eth_keyrings::{validate_mnemonic, HdKeyring, SimpleKeyring};
use keyring_utils::address::{is_same_address, normalize_address};
use keyring_utils::{
    into_handle, DisplayKeyring, DisplayedAccount, DisplayedKeyring, Keyring, KeyringAccount,
    KeyringHandle, KeyringSerializedData, KeyringType,
};

use crate::encryptor::{PasswordEncryptor, VaultEncryptor};
use crate::error::{Result, ServiceError};
use crate::merge::merge_vaults;
use crate::registry::KeyringRegistry;
use crate::store::{PersistStore, StorageAdapter};
use crate::types::{KeyringEvent, KeyringState, MemStoreState, UnlockScene};

/// Storage key the service state persists under
const STORE_NAME: &str = "keyrings";

/// Callback assigning an alias to a freshly added account
pub type AliasCallback = Box<dyn Fn(&KeyringAccount) + Send + Sync>;

/// Construction options for [`KeyringService`]
pub struct ServiceOptions {
    pub encryptor: Box<dyn VaultEncryptor>,
    pub registry: KeyringRegistry,
    pub on_set_address_alias: Option<AliasCallback>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            encryptor: Box::new(PasswordEncryptor::default()),
            registry: KeyringRegistry::with_software_backends(),
            on_set_address_alias: None,
        }
    }
}

/// The keyring orchestration service
pub struct KeyringService {
    keyrings: Mutex<Vec<KeyringHandle>>,
    password: Mutex<Option<String>>,
    submitting: Mutex<bool>,
    store: PersistStore<KeyringState>,
    mem_store: Mutex<MemStoreState>,
    registry: KeyringRegistry,
    encryptor: Box<dyn VaultEncryptor>,
    events: broadcast::Sender<KeyringEvent>,
    on_set_address_alias: Option<AliasCallback>,
}

impl KeyringService {
    /// Create a service with the software backends and default encryptor
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Result<Self> {
        Self::with_options(storage, ServiceOptions::default())
    }

    pub fn with_options(storage: Arc<dyn StorageAdapter>, options: ServiceOptions) -> Result<Self> {
        let store = PersistStore::load(storage, STORE_NAME, KeyringState::default())?;
        let (events, _) = broadcast::channel(64);
        let mem_store = MemStoreState {
            keyring_types: options.registry.types(),
            ..Default::default()
        };
        Ok(Self {
            keyrings: Mutex::new(Vec::new()),
            password: Mutex::new(None),
            submitting: Mutex::new(false),
            store,
            mem_store: Mutex::new(mem_store),
            registry: options.registry,
            encryptor: options.encryptor,
            events,
            on_set_address_alias: options.on_set_address_alias,
        })
    }

    /// Subscribe to service events
    pub fn subscribe(&self) -> broadcast::Receiver<KeyringEvent> {
        self.events.subscribe()
    }

    fn setup_boot(&self, password: &str) -> Result<()> {
        *self.password.lock().unwrap() = Some(password.to_string());
        let marker = self.encryptor.encrypt(password, b"true")?;
        self.store.update(|state| state.booted = Some(marker))?;
        Ok(())
    }

    /// Set the session password and write the encrypted boot marker
    pub fn boot(&self, password: &str) -> Result<()> {
        self.setup_boot(password)?;
        self.update_mem(|state| state.is_unlocked = true);
        Ok(())
    }

    /// Re-encrypt the boot marker and vault under a new password
    pub fn update_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        self.verify_password(old_password)?;
        let _ = self.events.send(KeyringEvent::BeforeUpdatePassword);
        self.setup_boot(new_password)?;
        self.persist_all_keyrings()
    }

    /// Number of non-empty keyring groups
    pub fn get_count_of_accounts_in_keyring(&self) -> usize {
        self.get_all_typed_visible_accounts().len()
    }

    /// Force a new password, only allowed while no accounts exist
    pub fn reset_password(&self, new_password: &str) -> Result<()> {
        if self.get_count_of_accounts_in_keyring() > 0 {
            return Err(ServiceError::PasswordAlreadySet);
        }

        self.setup_boot(new_password)?;
        self.keyrings.lock().unwrap().clear();
        if let Err(e) = self.persist_all_keyrings() {
            warn!(error = %e, "persist after password reset failed");
        }
        self.update_mem(|state| state.keyrings.clear());
        Ok(())
    }

    /// Wipe the keyrings, optionally rebooting under a new password
    pub fn dangerously_reset_password_and_keyrings(
        &self,
        old_password: &str,
        new_password: Option<&str>,
    ) -> Result<()> {
        match new_password {
            Some(new_password) => {
                self.keyrings.lock().unwrap().clear();
                self.update_password(old_password, new_password)?;
                self.persist_all_keyrings()
            }
            None => {
                self.verify_password(old_password)?;
                self.keyrings.lock().unwrap().clear();
                self.persist_all_keyrings()?;
                self.update_mem(|state| state.keyrings.clear());
                self.store.update(|state| {
                    state.vault = None;
                    state.booted = None;
                })
            }
        }
    }

    pub fn is_booted(&self) -> bool {
        self.store
            .get()
            .booted
            .as_deref()
            .map_or(false, |marker| !marker.is_empty())
    }

    pub fn is_unlocked(&self) -> bool {
        self.mem_store.lock().unwrap().is_unlocked
    }

    pub fn has_vault(&self) -> bool {
        self.store
            .get()
            .vault
            .as_deref()
            .map_or(false, |vault| !vault.is_empty())
    }

    /// Emit an update event and return the session state
    pub fn full_update(&self) -> MemStoreState {
        let _ = self.events.send(KeyringEvent::Update);
        self.mem_state()
    }

    /// Import a private key as a new single-key keyring
    pub fn import_private_key(&self, private_key: &str) -> Result<KeyringHandle> {
        self.persist_all_keyrings()?;
        let keyring = SimpleKeyring::from_private_keys(&[private_key])?;
        let handle = self.add_keyring(Box::new(keyring))?;

        let address = handle.lock().unwrap().get_accounts().first().cloned();
        if let (Some(callback), Some(address)) = (&self.on_set_address_alias, address) {
            callback(&KeyringAccount::new(KeyringType::SimpleKeyring, address));
        }

        self.persist_all_keyrings()?;
        self.set_unlocked(UnlockScene::FinishImportPrivateKey);
        self.full_update();
        Ok(handle)
    }

    /// First live keyring of the given type
    pub fn get_keyring_by_type(&self, kind: KeyringType) -> Option<KeyringHandle> {
        self.keyrings
            .lock()
            .unwrap()
            .iter()
            .find(|handle| handle.lock().unwrap().keyring_type() == kind)
            .cloned()
    }

    /// All live keyrings of the given type
    pub fn get_keyrings_by_type(&self, kind: KeyringType) -> Vec<KeyringHandle> {
        self.keyrings
            .lock()
            .unwrap()
            .iter()
            .filter(|handle| handle.lock().unwrap().keyring_type() == kind)
            .cloned()
            .collect()
    }

    /// Build an empty keyring of `kind` and add it to the vault
    pub fn add_new_keyring(&self, kind: KeyringType) -> Result<KeyringHandle> {
        let keyring = self.registry.build(kind)?;
        self.add_keyring(keyring)
    }

    /// Drop the session password and every unlocked keyring
    pub fn set_locked(&self) -> MemStoreState {
        if let Some(mut password) = self.password.lock().unwrap().take() {
            password.zeroize();
        }
        self.update_mem(|state| state.is_unlocked = false);
        self.keyrings.lock().unwrap().clear();
        self.update_mem_store_keyrings();
        let _ = self.events.send(KeyringEvent::Lock);
        self.full_update()
    }

    fn set_unlocked(&self, scene: UnlockScene) {
        self.update_mem(|state| state.is_unlocked = true);
        let _ = self.events.send(KeyringEvent::Unlock { scene });
    }

    /// Verify the password against the boot marker and load the vault
    pub fn submit_password(&self, password: &str) -> Result<MemStoreState> {
        {
            let mut submitting = self.submitting.lock().unwrap();
            if *submitting {
                return Ok(self.mem_state());
            }
            *submitting = true;
        }

        if let Err(e) = self.verify_password(password) {
            *self.submitting.lock().unwrap() = false;
            return Err(e);
        }
        *self.password.lock().unwrap() = Some(password.to_string());

        // A vault that fails to load still counts as an unlocked session,
        // the marker check above already proved the password
        if let Err(e) = self.unlock_keyrings(password) {
            warn!(error = %e, "vault unlock failed");
        }
        self.set_unlocked(UnlockScene::Unlock);
        *self.submitting.lock().unwrap() = false;

        // Older installs may predate the unencrypted mirror
        if self.store.get().unencrypted_keyring_data.is_none() {
            self.persist_all_keyrings()?;
        }

        Ok(self.full_update())
    }

    /// Check a password by decrypting the boot marker
    pub fn verify_password(&self, password: &str) -> Result<()> {
        let marker = self
            .store
            .get()
            .booted
            .filter(|marker| !marker.is_empty())
            .ok_or(ServiceError::NoVault)?;
        self.encryptor.decrypt(password, &marker)?;
        Ok(())
    }

    /// Fail when any same-type keyring already holds one of `accounts`
    fn check_for_duplicate(&self, kind: KeyringType, accounts: &[String]) -> Result<()> {
        let existing: Vec<String> = self
            .get_keyrings_by_type(kind)
            .iter()
            .flat_map(|handle| handle.lock().unwrap().get_accounts())
            .map(|address| normalize_address(&address))
            .collect();

        for account in accounts {
            if existing.iter().any(|key| key == &normalize_address(account)) {
                return Err(ServiceError::DuplicateAccount(account.clone()));
            }
        }
        Ok(())
    }

    /// Derive one more account on `keyring` and announce every account row
    pub fn add_new_account(&self, keyring: &KeyringHandle) -> Result<Vec<KeyringAccount>> {
        let rows = {
            let mut guard = keyring.lock().unwrap();
            guard.add_accounts(1)?;
            let kind = guard.keyring_type();
            match guard.accounts_with_brand() {
                Some(rows) => rows
                    .into_iter()
                    .map(|row| {
                        let brand_name = row
                            .real_brand_name
                            .clone()
                            .unwrap_or_else(|| row.brand_name.clone());
                        KeyringAccount {
                            address: normalize_address(&row.address),
                            brand_name,
                            kind: row.kind,
                            real_brand_name: row.real_brand_name,
                            real_brand_url: row.real_brand_url,
                        }
                    })
                    .collect::<Vec<_>>(),
                None => guard
                    .get_accounts()
                    .into_iter()
                    .map(|address| KeyringAccount::new(kind, normalize_address(&address)))
                    .collect(),
            }
        };

        for account in &rows {
            let _ = self.events.send(KeyringEvent::NewAccount(account.clone()));
            if let Some(callback) = &self.on_set_address_alias {
                callback(account);
            }
        }

        self.persist_all_keyrings()?;
        self.update_mem_store_keyrings();
        self.full_update();
        Ok(rows)
    }

    /// Export the private key behind `address`
    pub fn export_account(&self, address: &str) -> Result<String> {
        let handle = self.get_keyring_for_account(address, None, true)?;
        let key = handle
            .lock()
            .unwrap()
            .export_account(&normalize_address(address))?;
        Ok(key)
    }

    /// Sign a transaction with the keyring's key for `from`
    pub fn sign_transaction(
        &self,
        keyring: &KeyringHandle,
        tx: &TypedTransaction,
        from: &str,
    ) -> Result<Signature> {
        let address = normalize_address(from);
        Ok(keyring.lock().unwrap().sign_transaction(&address, tx)?)
    }

    /// Sign a personal message, prefixing per the personal sign expectation
    pub fn sign_personal_message(
        &self,
        keyring: &KeyringHandle,
        from: &str,
        message: &[u8],
    ) -> Result<Signature> {
        let address = normalize_address(from);
        Ok(keyring
            .lock()
            .unwrap()
            .sign_personal_message(&address, message)?)
    }

    /// Sign an EIP-712 typed data payload
    pub fn sign_typed_data(
        &self,
        keyring: &KeyringHandle,
        from: &str,
        typed_data: &TypedData,
    ) -> Result<Signature> {
        let address = normalize_address(from);
        Ok(keyring
            .lock()
            .unwrap()
            .sign_typed_data(&address, typed_data)?)
    }

    /// Remove one account, dropping the keyring when it empties
    pub fn remove_account(
        &self,
        address: &str,
        kind: KeyringType,
        brand: Option<&str>,
        remove_empty_keyring: bool,
    ) -> Result<()> {
        let handle = self.get_keyring_for_account(address, Some(kind), true)?;
        let emptied = {
            let mut guard = handle.lock().unwrap();
            match guard.remove_account(address, brand) {
                Ok(()) => {}
                Err(keyring_utils::Error::Unsupported { .. }) => {
                    return Err(ServiceError::RemovalUnsupported(
                        guard.keyring_type().as_str().to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
            guard.get_accounts().is_empty()
        };

        let account = KeyringAccount {
            address: address.to_string(),
            brand_name: brand.unwrap_or("").to_string(),
            kind,
            real_brand_name: None,
            real_brand_url: None,
        };
        let _ = self.events.send(KeyringEvent::RemovedAccount(account));

        if emptied && remove_empty_keyring {
            if let Err(e) = handle.lock().unwrap().forget_device() {
                warn!(error = %e, "forget device failed");
            }
            self.keyrings
                .lock()
                .unwrap()
                .retain(|candidate| !Arc::ptr_eq(candidate, &handle));
        }

        self.persist_all_keyrings()?;
        self.update_mem_store_keyrings();
        self.full_update();
        Ok(())
    }

    /// Drop every keyring carrying the given identity key
    pub fn remove_keyring_by_public_key(&self, public_key: &str) -> Result<()> {
        self.keyrings.lock().unwrap().retain(|handle| {
            match handle.lock().unwrap().public_key() {
                Some(key) => key != public_key,
                None => true,
            }
        });
        self.persist_all_keyrings()?;
        self.update_mem_store_keyrings();
        self.full_update();
        Ok(())
    }

    /// Add a constructed keyring to the vault after a duplicate check
    pub fn add_keyring(&self, keyring: Box<dyn Keyring>) -> Result<KeyringHandle> {
        let kind = keyring.keyring_type();
        let accounts = keyring.get_accounts();
        self.check_for_duplicate(kind, &accounts)?;

        let handle = into_handle(keyring);
        self.keyrings.lock().unwrap().push(handle.clone());
        self.persist_all_keyrings()?;
        self.update_mem_store_keyrings();
        self.full_update();
        Ok(handle)
    }

    /// Serialize every keyring, encrypt the result and write it to storage
    ///
    /// Keyrings whose payloads hold secrets are kept out of the plaintext
    /// mirror. An empty single-key keyring is dropped from the mirror without
    /// marking the vault as holding secrets.
    pub fn persist_all_keyrings(&self) -> Result<()> {
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::PasswordNotSet)?;

        let serialized = self.serialized_keyrings()?;

        let mut has_encrypted_keyring_data = false;
        let mut unencrypted_keyring_data = Vec::new();
        for entry in &serialized {
            let holds_secrets = entry
                .keyring_type()
                .map_or(false, |kind| kind.holds_secrets());
            if !holds_secrets {
                unencrypted_keyring_data.push(entry.clone());
                continue;
            }
            if entry.kind == KeyringType::SimpleKeyring.as_str()
                && entry.data.as_array().map_or(true, |keys| keys.is_empty())
            {
                continue;
            }
            has_encrypted_keyring_data = true;
        }

        let plaintext = serde_json::to_vec(&serialized)?;
        let vault = self.encryptor.encrypt(&password, &plaintext)?;

        self.store.update(|state| {
            state.vault = Some(vault);
            state.unencrypted_keyring_data = Some(unencrypted_keyring_data);
            state.has_encrypted_keyring_data = has_encrypted_keyring_data;
        })
    }

    /// Decrypt the vault and load its keyrings into memory
    pub fn unlock_keyrings(&self, password: &str) -> Result<()> {
        let encrypted = self
            .store
            .get()
            .vault
            .filter(|vault| !vault.is_empty())
            .ok_or(ServiceError::NoVault)?;

        self.clear_keyrings();
        let plaintext = self.encryptor.decrypt(password, &encrypted)?;
        let vault: Vec<KeyringSerializedData> = serde_json::from_slice(&plaintext)?;
        for entry in &vault {
            self.restore_entry(entry, true)?;
        }
        self.update_mem_store_keyrings();
        Ok(())
    }

    /// Load one serialized keyring into memory
    pub fn restore_keyring(&self, serialized: &KeyringSerializedData) -> Result<KeyringHandle> {
        let handle = self.restore_entry(serialized, true)?;
        self.update_mem_store_keyrings();
        Ok(handle)
    }

    fn restore_entry(&self, entry: &KeyringSerializedData, push: bool) -> Result<KeyringHandle> {
        let kind = entry.keyring_type()?;
        let mut keyring = self.registry.build(kind)?;
        keyring.deserialize(entry.data.clone())?;
        let handle = into_handle(keyring);
        if push {
            self.keyrings.lock().unwrap().push(handle.clone());
        }
        Ok(handle)
    }

    /// Deallocate every managed keyring
    pub fn clear_keyrings(&self) {
        self.keyrings.lock().unwrap().clear();
        self.update_mem(|state| state.keyrings.clear());
    }

    /// Normalized addresses across every unlocked keyring
    pub fn get_accounts(&self) -> Vec<String> {
        let handles = self.keyrings.lock().unwrap().clone();
        handles
            .iter()
            .flat_map(|handle| handle.lock().unwrap().get_accounts())
            .map(|address| normalize_address(&address))
            .collect()
    }

    /// The keyring managing `address`, optionally narrowed by type
    pub fn get_keyring_for_account(
        &self,
        address: &str,
        kind: Option<KeyringType>,
        include_watch_keyring: bool,
    ) -> Result<KeyringHandle> {
        let hexed = normalize_address(address);
        debug!(address = %hexed, "looking up keyring for account");

        let handles = self.keyrings.lock().unwrap().clone();
        for handle in handles {
            let guard = handle.lock().unwrap();
            let keyring_kind = guard.keyring_type();
            if let Some(kind) = kind {
                if keyring_kind != kind {
                    continue;
                }
            }
            if !include_watch_keyring && keyring_kind == KeyringType::WatchAddressKeyring {
                continue;
            }
            let matched = guard
                .get_accounts()
                .iter()
                .any(|account| normalize_address(account) == hexed);
            drop(guard);
            if matched {
                return Ok(handle);
            }
        }
        Err(ServiceError::NoKeyringFound)
    }

    /// Display projection of one keyring
    pub fn display_for_keyring(&self, handle: &KeyringHandle) -> DisplayedKeyring {
        let (kind, accounts, by_import, public_key) = {
            let guard = handle.lock().unwrap();
            let kind = guard.keyring_type();
            let accounts: Vec<DisplayedAccount> = match guard.accounts_with_brand() {
                Some(rows) => rows
                    .into_iter()
                    .map(|row| DisplayedAccount {
                        address: normalize_address(&row.address),
                        brand_name: row.brand_name,
                        alias_name: None,
                    })
                    .collect(),
                None => guard
                    .get_accounts()
                    .into_iter()
                    .map(|address| DisplayedAccount {
                        address: normalize_address(&address),
                        brand_name: kind.as_str().to_string(),
                        alias_name: None,
                    })
                    .collect(),
            };
            (kind, accounts, guard.by_import(), guard.public_key())
        };

        DisplayedKeyring {
            kind,
            accounts,
            keyring: DisplayKeyring::new(handle.clone()),
            by_import,
            public_key,
        }
    }

    /// Display projection of every unlocked keyring
    pub fn get_all_typed_accounts(&self) -> Vec<DisplayedKeyring> {
        let handles = self.keyrings.lock().unwrap().clone();
        handles
            .iter()
            .map(|handle| self.display_for_keyring(handle))
            .collect()
    }

    /// Display projection of keyrings that hold at least one account
    pub fn get_all_typed_visible_accounts(&self) -> Vec<DisplayedKeyring> {
        self.get_all_typed_accounts()
            .into_iter()
            .filter(|group| !group.accounts.is_empty())
            .collect()
    }

    /// Flat account rows across every non-empty keyring
    pub fn get_all_visible_accounts_array(&self) -> Vec<KeyringAccount> {
        self.get_all_typed_visible_accounts()
            .iter()
            .flat_map(|group| {
                group.accounts.iter().map(|account| KeyringAccount {
                    address: account.address.clone(),
                    brand_name: account.brand_name.clone(),
                    kind: group.kind,
                    real_brand_name: None,
                    real_brand_url: None,
                })
            })
            .collect()
    }

    /// Flat account rows across every keyring, empty ones included
    pub fn get_all_addresses(&self) -> Vec<KeyringAccount> {
        self.get_all_typed_accounts()
            .iter()
            .flat_map(|group| {
                group.accounts.iter().map(|account| KeyringAccount {
                    address: account.address.clone(),
                    brand_name: account.brand_name.clone(),
                    kind: group.kind,
                    real_brand_name: None,
                    real_brand_url: None,
                })
            })
            .collect()
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.get_all_addresses()
            .iter()
            .any(|account| is_same_address(&account.address, address))
    }

    fn update_mem_store_keyrings(&self) {
        let keyrings = self.get_all_typed_accounts();
        self.update_mem(|state| state.keyrings = keyrings);
    }

    pub fn generate_mnemonic(&self) -> Result<String> {
        Ok(eth_keyrings::generate_mnemonic()?)
    }

    /// Generate a mnemonic and stage it encrypted until onboarding finishes
    pub fn generate_pre_mnemonic(&self) -> Result<String> {
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Locked)?;
        let mnemonic = eth_keyrings::generate_mnemonic()?;
        let staged = self.encryptor.encrypt(&password, mnemonic.as_bytes())?;
        self.update_mem(|state| state.pre_mnemonics = staged);
        Ok(mnemonic)
    }

    pub fn remove_pre_mnemonics(&self) {
        self.update_mem(|state| state.pre_mnemonics.clear());
    }

    /// Recover the staged mnemonic, empty when none is staged
    pub fn get_pre_mnemonics(&self) -> Result<String> {
        let staged = self.mem_store.lock().unwrap().pre_mnemonics.clone();
        if staged.is_empty() {
            return Ok(String::new());
        }
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Locked)?;
        let plaintext = self.encryptor.decrypt(&password, &staged)?;
        String::from_utf8(plaintext)
            .map_err(|_| ServiceError::Encryptor("staged mnemonic is not utf-8".to_string()))
    }

    /// Create a mnemonic keyring with no active accounts yet
    pub fn create_keyring_with_mnemonics(
        &self,
        seed: &str,
        by_import: bool,
    ) -> Result<KeyringHandle> {
        if !validate_mnemonic(seed) {
            return Err(ServiceError::InvalidMnemonic);
        }

        self.persist_all_keyrings()?;
        let keyring = HdKeyring::from_mnemonic(seed, "", by_import)?;
        let handle = self.add_keyring(Box::new(keyring))?;
        self.persist_all_keyrings()?;
        self.set_unlocked(UnlockScene::FinishCreateKeyringWithMnemonics);
        self.full_update();
        Ok(handle)
    }

    /// Assign the next sibling ordinal to a mnemonic keyring not yet added
    pub fn update_hd_keyring_index(&self, keyring: &KeyringHandle) -> Result<()> {
        if keyring.lock().unwrap().keyring_type() != KeyringType::HdKeyring {
            return Ok(());
        }
        let handles = self.keyrings.lock().unwrap().clone();
        if handles.iter().any(|handle| Arc::ptr_eq(handle, keyring)) {
            return Ok(());
        }

        let mut highest: i64 = -1;
        let mut count: i64 = 0;
        for handle in &handles {
            let guard = handle.lock().unwrap();
            if guard.keyring_type() != KeyringType::HdKeyring {
                continue;
            }
            count += 1;
            if let Some(index) = guard.hd_index() {
                highest = highest.max(index as i64);
            }
        }

        let next = highest.max(count - 1) + 1;
        keyring.lock().unwrap().set_hd_index(next as u32)?;
        Ok(())
    }

    /// Whether storage carries the plaintext mirror at all
    pub fn saved_unencrypted_keyring_data(&self) -> bool {
        self.store.get().unencrypted_keyring_data.is_some()
    }

    /// Whether the vault holds seed phrases or private keys
    pub fn has_encrypted_keyring_data(&self) -> bool {
        self.store.get().has_encrypted_keyring_data
    }

    /// Whether the plaintext mirror holds any entries
    pub fn has_unencrypted_keyring_data(&self) -> bool {
        self.store
            .get()
            .unencrypted_keyring_data
            .map_or(false, |mirror| !mirror.is_empty())
    }

    /// Wire types present in the plaintext mirror
    pub fn get_unencrypted_keyring_types(&self) -> Vec<String> {
        self.store
            .get()
            .unencrypted_keyring_data
            .map(|mirror| mirror.into_iter().map(|entry| entry.kind).collect())
            .unwrap_or_default()
    }

    pub fn reset_booted(&self) -> Result<()> {
        self.store.update(|state| state.booted = None)
    }

    /// Fold a vault exported elsewhere into this install
    ///
    /// Returns the accounts the fold added. Mnemonic entries list their
    /// accounts under per-address details, which are promoted to the plain
    /// account list before restoring.
    pub fn sync_vault(
        &self,
        vault: Vec<KeyringSerializedData>,
    ) -> Result<Vec<KeyringAccount>> {
        let incoming: Vec<KeyringSerializedData> = vault
            .into_iter()
            .map(|mut entry| {
                if entry.kind == KeyringType::HdKeyring.as_str() {
                    if let Some(map) = entry.data.as_object_mut() {
                        let accounts: Vec<Value> = map
                            .get("accountDetails")
                            .and_then(Value::as_object)
                            .map(|details| details.keys().cloned().map(Value::String).collect())
                            .unwrap_or_default();
                        map.insert("accounts".to_string(), Value::Array(accounts));
                    }
                }
                entry
            })
            .collect();

        let encrypted = self
            .store
            .get()
            .vault
            .filter(|vault| !vault.is_empty())
            .ok_or(ServiceError::NoVault)?;
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Locked)?;
        let plaintext = self.encryptor.decrypt(&password, &encrypted)?;
        let current: Vec<KeyringSerializedData> = serde_json::from_slice(&plaintext)?;

        let existing = self.get_all_visible_accounts_array();

        let mut added_accounts = Vec::new();
        for entry in &incoming {
            let handle = self.restore_entry(entry, false)?;
            let display = self.display_for_keyring(&handle);
            for row in &display.accounts {
                let already_present = existing.iter().any(|account| {
                    account.address.eq_ignore_ascii_case(&row.address)
                        && account.kind == display.kind
                });
                if !already_present {
                    added_accounts.push(KeyringAccount {
                        address: row.address.clone(),
                        brand_name: row.brand_name.clone(),
                        kind: display.kind,
                        real_brand_name: None,
                        real_brand_url: None,
                    });
                }
            }
        }

        self.clear_keyrings();
        let merged = merge_vaults(current, incoming);
        debug!(
            entries = merged.len(),
            added = added_accounts.len(),
            "merged incoming vault"
        );
        for entry in &merged {
            self.restore_entry(entry, true)?;
        }
        self.persist_all_keyrings()?;
        self.update_mem_store_keyrings();
        Ok(added_accounts)
    }

    /// Encrypt arbitrary content under the session password
    pub fn encrypt_with_password(&self, content: &[u8]) -> Result<String> {
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Locked)?;
        self.encryptor.encrypt(&password, content)
    }

    /// Decrypt content encrypted under the session password
    pub fn decrypt_with_password(&self, payload: &str) -> Result<Vec<u8>> {
        let password = self
            .password
            .lock()
            .unwrap()
            .clone()
            .ok_or(ServiceError::Locked)?;
        self.encryptor.decrypt(&password, payload)
    }

    fn serialized_keyrings(&self) -> Result<Vec<KeyringSerializedData>> {
        let handles = self.keyrings.lock().unwrap().clone();
        let mut serialized = Vec::with_capacity(handles.len());
        for handle in &handles {
            let guard = handle.lock().unwrap();
            serialized.push(KeyringSerializedData::new(
                guard.keyring_type().as_str(),
                guard.serialize()?,
            ));
        }
        Ok(serialized)
    }

    fn mem_state(&self) -> MemStoreState {
        self.mem_store.lock().unwrap().clone()
    }

    fn update_mem(&self, mutate: impl FnOnce(&mut MemStoreState)) {
        mutate(&mut self.mem_store.lock().unwrap());
    }
}
