//! End to end vault lifecycle over file backed storage

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use keyring_service::{FileStorage, KeyringService, ServiceError};
use keyring_utils::{KeyringSerializedData, KeyringType};

const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const HD_ADDRESS: &str = "0x9858effd232b4033e47d90003d41ec34ecaeda94";

const PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const KEY_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

const WATCH_ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

const PASSWORD: &str = "correct horse battery staple";

fn open(dir: &Path) -> KeyringService {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let storage = Arc::new(FileStorage::new(dir).unwrap());
    KeyringService::new(storage).unwrap()
}

#[test]
fn test_vault_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let service = open(dir.path());
    service.boot(PASSWORD).unwrap();
    let hd = service.create_keyring_with_mnemonics(MNEMONIC, false).unwrap();
    service.add_new_account(&hd).unwrap();
    service.import_private_key(PRIVATE_KEY).unwrap();
    drop(service);

    let service = open(dir.path());
    assert!(service.is_booted());
    assert!(service.has_vault());
    assert!(!service.is_unlocked());
    assert!(service.get_accounts().is_empty());

    assert!(matches!(
        service.submit_password("not the password").unwrap_err(),
        ServiceError::WrongPassword
    ));
    assert!(!service.is_unlocked());

    let state = service.submit_password(PASSWORD).unwrap();
    assert!(state.is_unlocked);
    assert_eq!(state.keyrings.len(), 2);

    let mut accounts = service.get_accounts();
    accounts.sort();
    let mut expected = vec![HD_ADDRESS.to_string(), KEY_ADDRESS.to_string()];
    expected.sort();
    assert_eq!(accounts, expected);

    let keyring = service.get_keyring_for_account(KEY_ADDRESS, None, true).unwrap();
    assert_eq!(service.export_account(KEY_ADDRESS).unwrap(), PRIVATE_KEY);
    assert_eq!(
        keyring.lock().unwrap().keyring_type(),
        KeyringType::SimpleKeyring
    );

    // key material never reaches storage in the clear
    let raw = std::fs::read_to_string(dir.path().join("keyrings.json")).unwrap();
    assert!(!raw.contains(PRIVATE_KEY));
    assert!(!raw.contains("abandon"));
}

#[test]
fn test_password_change_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let service = open(dir.path());
    service.boot(PASSWORD).unwrap();
    service.import_private_key(PRIVATE_KEY).unwrap();
    service.update_password(PASSWORD, "a stronger passphrase").unwrap();
    drop(service);

    let service = open(dir.path());
    assert!(matches!(
        service.submit_password(PASSWORD).unwrap_err(),
        ServiceError::WrongPassword
    ));

    let state = service.submit_password("a stronger passphrase").unwrap();
    assert!(state.is_unlocked);
    assert_eq!(service.get_accounts(), vec![KEY_ADDRESS.to_string()]);
}

#[test]
fn test_synced_accounts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let service = open(dir.path());
    service.boot(PASSWORD).unwrap();
    let hd = service.create_keyring_with_mnemonics(MNEMONIC, false).unwrap();
    service.add_new_account(&hd).unwrap();

    let incoming = vec![
        KeyringSerializedData::new(
            "HD Key Tree",
            json!({
                "mnemonic": MNEMONIC,
                "hdPath": "m/44'/60'/0'/0",
                "accountDetails": {
                    "0x9858EfFD232B4033E47d90003D41EC34EcaEda94": { "index": 0 }
                }
            }),
        ),
        KeyringSerializedData::new("Watch Address", json!({ "accounts": [WATCH_ADDRESS] })),
    ];

    let added = service.sync_vault(incoming).unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].address, WATCH_ADDRESS.to_lowercase());
    drop(service);

    let service = open(dir.path());

    // the watch entry is readable from the mirror while still locked
    assert!(service.has_unencrypted_keyring_data());
    assert_eq!(
        service.get_unencrypted_keyring_types(),
        vec!["Watch Address".to_string()]
    );
    assert!(service.has_encrypted_keyring_data());

    service.submit_password(PASSWORD).unwrap();
    let mut accounts = service.get_accounts();
    accounts.sort();
    let mut expected = vec![HD_ADDRESS.to_string(), WATCH_ADDRESS.to_lowercase()];
    expected.sort();
    assert_eq!(accounts, expected);

    let groups = service.get_all_typed_visible_accounts();
    assert_eq!(groups.len(), 2);
    let watch_group = groups
        .iter()
        .find(|group| group.kind == KeyringType::WatchAddressKeyring)
        .unwrap();
    assert_eq!(watch_group.accounts[0].brand_name, "Watch Address");
}
