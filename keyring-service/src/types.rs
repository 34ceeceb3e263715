//! Service state and event types

use keyring_utils::{DisplayedKeyring, KeyringAccount, KeyringSerializedData};
use serde::{Deserialize, Serialize};

/// Durable service state as written to storage
///
/// `booted` and `vault` are encryptor envelopes. The unencrypted mirror
/// exists only for installs that have not set a password yet and is dropped
/// the moment the vault is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyringState {
    /// Encrypted boot marker proving the password, set by [`crate::KeyringService::boot`]
    pub booted: Option<String>,
    /// Encrypted serialized keyrings
    pub vault: Option<String>,
    /// Plaintext mirror of software keyrings while no password exists
    pub unencrypted_keyring_data: Option<Vec<KeyringSerializedData>>,
    /// Set once the vault has ever been written, so a cleared mirror is not
    /// mistaken for a fresh install
    pub has_encrypted_keyring_data: bool,
}

/// Volatile session state mirrored to subscribers
#[derive(Debug, Clone, Default)]
pub struct MemStoreState {
    pub is_unlocked: bool,
    /// Wire names of every registered keyring type
    pub keyring_types: Vec<String>,
    /// Display projection of the unlocked keyrings
    pub keyrings: Vec<DisplayedKeyring>,
    /// Encrypted mnemonic staged during onboarding, empty when none
    pub pre_mnemonics: String,
}

/// Which flow finished when an unlock event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockScene {
    Unlock,
    FinishImportPrivateKey,
    FinishCreateKeyringWithMnemonics,
}

impl UnlockScene {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockScene::Unlock => "unlock",
            UnlockScene::FinishImportPrivateKey => "finish:importPrivateKey",
            UnlockScene::FinishCreateKeyringWithMnemonics => "finish:createKeyringWithMnemonics",
        }
    }
}

/// Notifications published on the service event channel
#[derive(Debug, Clone)]
pub enum KeyringEvent {
    /// The session password is about to change
    BeforeUpdatePassword,
    Lock,
    Unlock { scene: UnlockScene },
    /// Keyrings or accounts changed, subscribers should re-read state
    Update,
    NewAccount(KeyringAccount),
    RemovedAccount(KeyringAccount),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_shape() {
        let state = KeyringState {
            booted: Some("marker".to_string()),
            vault: Some("payload".to_string()),
            unencrypted_keyring_data: None,
            has_encrypted_keyring_data: true,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["booted"], "marker");
        assert_eq!(json["vault"], "payload");
        assert_eq!(json["hasEncryptedKeyringData"], true);
    }

    #[test]
    fn test_state_defaults_from_empty_json() {
        let state: KeyringState = serde_json::from_str("{}").unwrap();
        assert!(state.booted.is_none());
        assert!(state.vault.is_none());
        assert!(state.unencrypted_keyring_data.is_none());
        assert!(!state.has_encrypted_keyring_data);
    }

    #[test]
    fn test_unlock_scene_strings() {
        assert_eq!(UnlockScene::Unlock.as_str(), "unlock");
        assert_eq!(
            UnlockScene::FinishImportPrivateKey.as_str(),
            "finish:importPrivateKey"
        );
        assert_eq!(
            UnlockScene::FinishCreateKeyringWithMnemonics.as_str(),
            "finish:createKeyringWithMnemonics"
        );
    }
}
